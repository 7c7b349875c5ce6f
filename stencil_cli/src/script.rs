//! Declarative TOML scripts.
//!
//! ```toml
//! [[template]]
//! name = "record"
//! min = 1
//! max = 4
//!
//! [[template.field]]
//! type = "block"
//! name = "key"
//! size = 8
//!
//! [[template.field]]
//! type = "block"
//! size = 16
//! filler = { function = "md5", field = "key" }
//!
//! [[field]]
//! type = "template"
//! name = "record"
//! min = 2
//! max = 3
//! ```
//!
//! Fillers are `{ function, field }`, `{ value }`, `{ float }` or
//! `{ field-value }`.

use serde::Deserialize;
use std::path::Path;
use stencil_core::node::{FieldNode, FillerNode};
use stencil_core::{Compiler, Handle, Script};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ScriptFile {
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateDecl>,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldDecl>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TemplateDecl {
    pub name: String,
    pub min: usize,
    pub max: usize,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldDecl>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub enum FieldDecl {
    Block {
        name: Option<String>,
        size: usize,
        filler: Option<FillerDecl>,
    },
    Variable {
        name: Option<String>,
        #[serde(rename = "min-size")]
        min_size: usize,
        #[serde(rename = "max-size")]
        max_size: usize,
        filler: Option<FillerDecl>,
    },
    Compound {
        name: Option<String>,
        #[serde(default, rename = "field")]
        fields: Vec<FieldDecl>,
    },
    Template {
        name: String,
        min: usize,
        max: usize,
    },
}

/// Filler tables are told apart by their keys.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum FillerDecl {
    Function(FunctionFillerDecl),
    Value(ValueFillerDecl),
    Float(FloatFillerDecl),
    FieldValue(FieldValueFillerDecl),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FunctionFillerDecl {
    pub function: String,
    pub field: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ValueFillerDecl {
    pub value: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FloatFillerDecl {
    pub float: f32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FieldValueFillerDecl {
    pub field_value: String,
}

impl ScriptFile {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read script at {:?}: {}", path, e))?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse script {:?}: {}", path, e))
    }

    /// Drives `compiler` through every declaration, templates first.
    pub fn compile_into(&self, mut compiler: Compiler) -> stencil_core::Result<Script> {
        for template in &self.templates {
            let fields = compile_fields(&mut compiler, &template.fields)?;
            let body = compiler.template_body(fields)?;
            compiler.define_template(&template.name, body, template.min, template.max)?;
        }
        let root = compile_fields(&mut compiler, &self.fields)?;
        compiler.set_script(root)?;
        compiler.finish()
    }

    pub fn compile(&self) -> stencil_core::Result<Script> {
        self.compile_into(Compiler::new())
    }
}

fn compile_fields(
    compiler: &mut Compiler,
    decls: &[FieldDecl],
) -> stencil_core::Result<Vec<Handle<FieldNode>>> {
    decls.iter().map(|decl| compile_field(compiler, decl)).collect()
}

fn compile_field(
    compiler: &mut Compiler,
    decl: &FieldDecl,
) -> stencil_core::Result<Handle<FieldNode>> {
    match decl {
        FieldDecl::Block { name, size, filler } => {
            let filler = compile_filler(compiler, filler.as_ref())?;
            compiler.block(name.as_deref(), *size, filler)
        }
        FieldDecl::Variable {
            name,
            min_size,
            max_size,
            filler,
        } => {
            let filler = compile_filler(compiler, filler.as_ref())?;
            compiler.variable_block(name.as_deref(), *min_size, *max_size, filler)
        }
        FieldDecl::Compound { name, fields } => {
            let children = compile_fields(compiler, fields)?;
            compiler.compound(name.as_deref(), children)
        }
        FieldDecl::Template { name, min, max } => compiler.template_instance(name, *min, *max),
    }
}

fn compile_filler(
    compiler: &mut Compiler,
    decl: Option<&FillerDecl>,
) -> stencil_core::Result<Option<Handle<FillerNode>>> {
    let Some(decl) = decl else {
        return Ok(None);
    };
    let handle = match decl {
        FillerDecl::Function(decl) => compiler.function_filler(&decl.field, &decl.function)?,
        FillerDecl::Value(decl) => {
            let value = compiler.literal(decl.value);
            compiler.value_filler(value)?
        }
        FillerDecl::Float(decl) => {
            let value = compiler.float_literal(decl.float);
            compiler.value_filler(value)?
        }
        FillerDecl::FieldValue(decl) => {
            let value = compiler.field_value(&decl.field_value);
            compiler.value_filler(value)?
        }
    };
    Ok(Some(handle))
}
