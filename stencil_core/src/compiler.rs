use crate::arena::{Handle, NodeArena};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::function::{FieldFunction, FunctionRegistry};
use crate::identifier::{FieldId, FieldMapper};
use crate::materialize::Materializer;
use crate::node::{FieldNode, FieldShape, FillerNode, TemplateBodyNode, ValueNode};
use crate::template::TemplateRegistry;
use log::debug;
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};

/// Builds the node graph of one script.
///
/// A front end drives the compiler bottom-up: values and fillers first, then
/// the fields that use them, then [`Compiler::set_script`] with the
/// top-level fields. Each compiler owns its own arena and registries, so
/// independent compilations never share state.
#[derive(Debug, Default)]
pub struct Compiler {
    arena: NodeArena,
    mapper: FieldMapper,
    functions: FunctionRegistry,
    templates: TemplateRegistry,
    root: Option<Vec<Handle<FieldNode>>>,
}

impl Compiler {
    /// A compiler whose function registry holds the built-ins.
    pub fn new() -> Self {
        Self::with_functions(FunctionRegistry::with_builtins())
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self {
            arena: NodeArena::new(),
            mapper: FieldMapper::new(),
            functions,
            templates: TemplateRegistry::new(),
            root: None,
        }
    }

    pub fn register_function<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(FieldId) -> Box<dyn FieldFunction> + Send + Sync + 'static,
    {
        self.functions.register(name, factory);
    }

    /// Identifier for `name`, whether or not its field is declared yet.
    pub fn identifier(&mut self, name: &str) -> FieldId {
        self.mapper.find_or_register(name)
    }

    pub fn block(
        &mut self,
        name: Option<&str>,
        size: usize,
        filler: Option<Handle<FillerNode>>,
    ) -> Result<Handle<FieldNode>> {
        self.terminal(name, FieldShape::Block { size, filler })
    }

    pub fn variable_block(
        &mut self,
        name: Option<&str>,
        min_size: usize,
        max_size: usize,
        filler: Option<Handle<FillerNode>>,
    ) -> Result<Handle<FieldNode>> {
        if min_size > max_size {
            return Err(Error::InvalidRange {
                context: format!("variable block '{}'", name.unwrap_or("<anonymous>")),
                min: min_size,
                max: max_size,
            });
        }
        self.terminal(
            name,
            FieldShape::VariableBlock {
                min_size,
                max_size,
                filler,
            },
        )
    }

    fn terminal(&mut self, name: Option<&str>, shape: FieldShape) -> Result<Handle<FieldNode>> {
        if let (Some(handle), Some(target)) = (shape.filler(), shape.fill_target()) {
            let filler = self.arena.get(handle).ok_or_else(|| foreign("filler", handle))?;
            // Output constraints depend only on the declared size.
            if let FillerNode::Function { function, input } = filler {
                let label = name.unwrap_or("<anonymous>");
                self.functions
                    .instantiate(function, *input)?
                    .check_output(&target, label)?;
            }
        }
        let id = name.map(|n| self.mapper.find_or_register(n));
        Ok(self.arena.alloc(FieldNode::new(id, shape)))
    }

    pub fn compound(
        &mut self,
        name: Option<&str>,
        fields: Vec<Handle<FieldNode>>,
    ) -> Result<Handle<FieldNode>> {
        self.check_fields(&fields)?;
        let id = name.map(|n| self.mapper.find_or_register(n));
        Ok(self
            .arena
            .alloc(FieldNode::new(id, FieldShape::Compound(fields))))
    }

    /// A template body, still to be bound with [`Compiler::define_template`].
    pub fn template_body(
        &mut self,
        fields: Vec<Handle<FieldNode>>,
    ) -> Result<Handle<TemplateBodyNode>> {
        self.check_fields(&fields)?;
        Ok(self.arena.alloc(TemplateBodyNode { fields }))
    }

    pub fn define_template(
        &mut self,
        name: &str,
        body: Handle<TemplateBodyNode>,
        min: usize,
        max: usize,
    ) -> Result<()> {
        if !self.arena.contains(body) {
            return Err(foreign("template body", body));
        }
        self.templates.define(name, body, min, max)
    }

    /// The template is looked up when the instance is materialized, so it
    /// may be defined after this call.
    pub fn template_instance(
        &mut self,
        name: &str,
        min: usize,
        max: usize,
    ) -> Result<Handle<FieldNode>> {
        if min > max {
            return Err(Error::InvalidRange {
                context: format!("instance of template '{name}'"),
                min,
                max,
            });
        }
        Ok(self.arena.alloc(FieldNode::anonymous(FieldShape::Template {
            name: name.to_string(),
            min,
            max,
        })))
    }

    pub fn literal(&mut self, value: u64) -> Handle<ValueNode> {
        self.arena.alloc(ValueNode::Literal(value))
    }

    /// A float constant, encoded as its four little-endian IEEE-754 bytes.
    pub fn float_literal(&mut self, value: f32) -> Handle<ValueNode> {
        self.arena.alloc(ValueNode::Float(value.to_bits()))
    }

    pub fn field_value(&mut self, field_name: &str) -> Handle<ValueNode> {
        let id = self.mapper.find_or_register(field_name);
        self.arena.alloc(ValueNode::FieldRef(id))
    }

    /// Filler applying `function_name` to the content of `field_name`.
    pub fn function_filler(
        &mut self,
        field_name: &str,
        function_name: &str,
    ) -> Result<Handle<FillerNode>> {
        if !self.functions.contains(function_name) {
            return Err(Error::UnknownFunction(function_name.to_string()));
        }
        let input = self.mapper.find_or_register(field_name);
        Ok(self.arena.alloc(FillerNode::Function {
            function: function_name.to_string(),
            input,
        }))
    }

    pub fn value_filler(&mut self, value: Handle<ValueNode>) -> Result<Handle<FillerNode>> {
        if !self.arena.contains(value) {
            return Err(foreign("value", value));
        }
        Ok(self.arena.alloc(FillerNode::Value(value)))
    }

    pub fn random_filler(&mut self) -> Handle<FillerNode> {
        self.arena.alloc(FillerNode::Random)
    }

    /// Sets the top-level field list. A later call replaces the earlier one.
    pub fn set_script(&mut self, fields: Vec<Handle<FieldNode>>) -> Result<()> {
        self.check_fields(&fields)?;
        self.root = Some(fields);
        Ok(())
    }

    /// Ends compilation. Fails if no top-level field list was set.
    pub fn finish(self) -> Result<Script> {
        let root = self
            .root
            .ok_or_else(|| Error::MalformedScript("script has no root field list".to_string()))?;
        debug!(
            "script compiled: {} nodes, {} identifiers, {} templates, {} top-level fields",
            self.arena.len(),
            self.mapper.len(),
            self.templates.len(),
            root.len()
        );
        Ok(Script {
            arena: self.arena,
            mapper: self.mapper,
            functions: self.functions,
            templates: self.templates,
            root,
        })
    }

    fn check_fields(&self, fields: &[Handle<FieldNode>]) -> Result<()> {
        match fields.iter().find(|h| !self.arena.contains(**h)) {
            Some(handle) => Err(foreign("field", *handle)),
            None => Ok(()),
        }
    }
}

fn foreign<T>(what: &str, handle: Handle<T>) -> Error {
    Error::MalformedScript(format!("{what} node {handle:?} was not built by this compiler"))
}

/// A fully compiled, immutable script.
#[derive(Debug)]
pub struct Script {
    arena: NodeArena,
    mapper: FieldMapper,
    functions: FunctionRegistry,
    templates: TemplateRegistry,
    root: Vec<Handle<FieldNode>>,
}

impl Script {
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn root(&self) -> &[Handle<FieldNode>] {
        &self.root
    }

    pub fn identifier(&self, name: &str) -> Option<FieldId> {
        self.mapper.lookup(name)
    }

    pub fn materializer<'s, 'r>(&'s self, rng: &'r mut dyn RngCore) -> Materializer<'s, 'r> {
        Materializer::new(self, rng)
    }

    pub fn materialize(&self, rng: &mut dyn RngCore) -> Result<Field> {
        self.materializer(rng).materialize_root()
    }

    pub fn materialize_seeded(&self, seed: u64) -> Result<Field> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.materialize(&mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use crate::function::Constraint;
    use crate::functions::DigestAlgorithm;

    fn payload_and_digest(function: &str, digest_size: usize) -> Script {
        let mut compiler = Compiler::new();
        let payload = compiler.block(Some("payload"), 8, None).unwrap();
        let filler = compiler.function_filler("payload", function).unwrap();
        let digest = compiler
            .block(Some("digest"), digest_size, Some(filler))
            .unwrap();
        compiler.set_script(vec![payload, digest]).unwrap();
        compiler.finish().unwrap()
    }

    fn field<'a>(root: &'a Field, script: &Script, name: &str) -> &'a Field {
        root.find(script.identifier(name).unwrap())
            .unwrap_or_else(|| panic!("no field named {name}"))
    }

    #[test]
    fn digest_of_payload_is_reproducible() {
        let script = payload_and_digest("md5", 16);
        let first = script.materialize_seeded(7).unwrap();
        let second = script.materialize_seeded(7).unwrap();
        assert_eq!(first, second);

        let payload = field(&first, &script, "payload").bytes().unwrap();
        let digest = field(&first, &script, "digest").bytes().unwrap();
        assert_eq!(payload.len(), 8);
        assert_eq!(digest, &md5::compute(payload).0[..]);
    }

    #[test]
    fn different_seeds_give_different_trees() {
        let script = payload_and_digest("sha1", 20);
        let a = script.materialize_seeded(1).unwrap();
        let b = script.materialize_seeded(2).unwrap();
        assert_ne!(a, b);
        assert_eq!(field(&a, &script, "digest").len(), 20);
    }

    #[test]
    fn digest_depends_only_on_input_bytes() {
        let mut compiler = Compiler::new();
        let abc = compiler.literal(0x636261);
        let abc_filler = compiler.value_filler(abc).unwrap();
        let input = compiler.block(Some("input"), 3, Some(abc_filler)).unwrap();
        let sha = compiler.function_filler("input", "sha1").unwrap();
        let out = compiler.block(Some("out"), 20, Some(sha)).unwrap();
        compiler.set_script(vec![input, out]).unwrap();
        let script = compiler.finish().unwrap();

        for seed in 0..4 {
            let root = script.materialize_seeded(seed).unwrap();
            assert_eq!(field(&root, &script, "input").bytes(), Some(&b"abc"[..]));
            assert_eq!(
                field(&root, &script, "out").bytes().unwrap(),
                DigestAlgorithm::Sha1.digest(b"abc").as_slice()
            );
        }
    }

    #[test]
    fn forward_reference_fails_before_definition() {
        let mut compiler = Compiler::new();
        let filler = compiler.function_filler("payload", "md5").unwrap();
        let digest = compiler.block(Some("digest"), 16, Some(filler)).unwrap();
        let payload = compiler.block(Some("payload"), 8, None).unwrap();
        compiler.set_script(vec![digest, payload]).unwrap();
        let script = compiler.finish().unwrap();

        let err = script.materialize_seeded(0).unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedReference {
                name: "payload".to_string(),
                id: script.identifier("payload").unwrap(),
            }
        );
    }

    #[test]
    fn forward_reference_resolves_once_materialized() {
        let mut compiler = Compiler::new();
        // Filler captures the identifier before "payload" is declared.
        let filler = compiler.function_filler("payload", "md5").unwrap();
        let payload = compiler.block(Some("payload"), 8, None).unwrap();
        let digest = compiler.block(Some("digest"), 16, Some(filler)).unwrap();
        compiler.set_script(vec![payload, digest]).unwrap();
        let script = compiler.finish().unwrap();

        let root = script.materialize_seeded(3).unwrap();
        let payload = field(&root, &script, "payload").bytes().unwrap();
        assert_eq!(
            field(&root, &script, "digest").bytes().unwrap(),
            &md5::compute(payload).0[..]
        );
    }

    #[test]
    fn unknown_function_is_rejected_at_declaration() {
        let mut compiler = Compiler::new();
        assert_eq!(
            compiler.function_filler("payload", "crc64"),
            Err(Error::UnknownFunction("crc64".to_string()))
        );
    }

    #[test]
    fn output_size_mismatch_is_rejected_at_declaration() {
        let mut compiler = Compiler::new();
        let filler = compiler.function_filler("payload", "md5").unwrap();
        match compiler.block(Some("digest"), 4, Some(filler)) {
            Err(Error::ConstraintViolation {
                function,
                field,
                constraint,
                ..
            }) => {
                assert_eq!(function, "md5");
                assert_eq!(field, "digest");
                assert_eq!(constraint, Constraint::OutputSize(16));
            }
            other => panic!("expected constraint violation, got {other:?}"),
        }

        let filler = compiler.function_filler("payload", "sha1").unwrap();
        assert!(compiler.variable_block(None, 10, 30, Some(filler)).is_ok());
    }

    #[test]
    fn compound_input_violates_terminal_constraint() {
        let mut compiler = Compiler::new();
        let inner = compiler.block(None, 4, None).unwrap();
        let group = compiler.compound(Some("group"), vec![inner]).unwrap();
        let filler = compiler.function_filler("group", "md5").unwrap();
        let digest = compiler.block(None, 16, Some(filler)).unwrap();
        compiler.set_script(vec![group, digest]).unwrap();
        let script = compiler.finish().unwrap();

        match script.materialize_seeded(0) {
            Err(Error::ConstraintViolation {
                function,
                field,
                constraint,
                ..
            }) => {
                assert_eq!(function, "md5");
                assert_eq!(field, "group");
                assert_eq!(constraint, Constraint::Terminal);
            }
            other => panic!("expected constraint violation, got {other:?}"),
        }
    }

    #[test]
    fn named_compound_can_be_copied_by_value() {
        let mut compiler = Compiler::new();
        let a = compiler.block(None, 2, None).unwrap();
        let b = compiler.block(None, 3, None).unwrap();
        let group = compiler.compound(Some("group"), vec![a, b]).unwrap();
        let value = compiler.field_value("group");
        let copy_filler = compiler.value_filler(value).unwrap();
        let copy = compiler
            .variable_block(Some("copy"), 0, 16, Some(copy_filler))
            .unwrap();
        compiler.set_script(vec![group, copy]).unwrap();
        let script = compiler.finish().unwrap();

        let root = script.materialize_seeded(8).unwrap();
        let group = field(&root, &script, "group");
        assert_eq!(group.children().len(), 2);
        assert_eq!(
            field(&root, &script, "copy").bytes().unwrap(),
            group.to_bytes().as_slice()
        );
    }

    #[test]
    fn variable_block_length_stays_in_range() {
        let mut compiler = Compiler::new();
        let block = compiler.variable_block(Some("v"), 3, 9, None).unwrap();
        compiler.set_script(vec![block]).unwrap();
        let script = compiler.finish().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let root = script.materialize(&mut rng).unwrap();
            let v = field(&root, &script, "v");
            assert_eq!(v.kind(), FieldKind::VariableBlock);
            assert!((3..=9).contains(&v.len()), "length {}", v.len());
        }
    }

    #[test]
    fn inverted_variable_range_is_rejected() {
        let mut compiler = Compiler::new();
        assert!(matches!(
            compiler.variable_block(Some("v"), 9, 3, None),
            Err(Error::InvalidRange { min: 9, max: 3, .. })
        ));
    }

    #[test]
    fn field_value_copies_earlier_content() {
        let mut compiler = Compiler::new();
        let src = compiler.block(Some("src"), 6, None).unwrap();
        let value = compiler.field_value("src");
        let copy_filler = compiler.value_filler(value).unwrap();
        let copy = compiler.block(Some("copy"), 4, Some(copy_filler)).unwrap();
        compiler.set_script(vec![src, copy]).unwrap();
        let script = compiler.finish().unwrap();

        let root = script.materialize_seeded(5).unwrap();
        let src = field(&root, &script, "src").bytes().unwrap();
        assert_eq!(field(&root, &script, "copy").bytes().unwrap(), &src[..4]);
    }

    #[test]
    fn float_literal_fills_ieee_bytes() {
        let mut compiler = Compiler::new();
        let value = compiler.float_literal(1.5);
        let filler = compiler.value_filler(value).unwrap();
        let exact = compiler.block(Some("exact"), 4, Some(filler)).unwrap();
        let value = compiler.float_literal(-2.0);
        let filler = compiler.value_filler(value).unwrap();
        let wide = compiler.block(Some("wide"), 6, Some(filler)).unwrap();
        compiler.set_script(vec![exact, wide]).unwrap();
        let script = compiler.finish().unwrap();

        let root = script.materialize_seeded(0).unwrap();
        assert_eq!(
            field(&root, &script, "exact").bytes().unwrap(),
            &1.5f32.to_le_bytes()[..]
        );
        assert_eq!(
            field(&root, &script, "wide").bytes().unwrap(),
            &[0x00, 0x00, 0x00, 0xc0, 0x00, 0x00][..]
        );
    }

    #[test]
    fn missing_root_is_malformed() {
        let compiler = Compiler::new();
        assert!(matches!(compiler.finish(), Err(Error::MalformedScript(_))));
    }

    #[test]
    fn handles_from_another_compiler_are_rejected() {
        let mut other = Compiler::new();
        for _ in 0..3 {
            other.block(None, 1, None).unwrap();
        }
        let foreign = other.block(None, 1, None).unwrap();

        let mut compiler = Compiler::new();
        assert!(matches!(
            compiler.compound(None, vec![foreign]),
            Err(Error::MalformedScript(_))
        ));
        assert!(matches!(
            compiler.set_script(vec![foreign]),
            Err(Error::MalformedScript(_))
        ));
    }

    #[test]
    fn same_index_handles_from_another_compiler_are_rejected() {
        let mut other = Compiler::new();
        let foreign = other.block(None, 100, None).unwrap();
        let foreign_filler = other.random_filler();
        let foreign_value = other.literal(9);

        let mut compiler = Compiler::new();
        let own = compiler.block(None, 1, None).unwrap();
        compiler.random_filler();
        compiler.literal(1);
        assert_eq!(own.index(), foreign.index());

        assert!(matches!(
            compiler.set_script(vec![foreign]),
            Err(Error::MalformedScript(_))
        ));
        assert!(matches!(
            compiler.block(None, 4, Some(foreign_filler)),
            Err(Error::MalformedScript(_))
        ));
        assert!(matches!(
            compiler.value_filler(foreign_value),
            Err(Error::MalformedScript(_))
        ));

        compiler.set_script(vec![own]).unwrap();
        let root = compiler.finish().unwrap().materialize_seeded(1).unwrap();
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn compilations_do_not_share_identifiers() {
        let mut a = Compiler::new();
        let mut b = Compiler::new();
        a.identifier("first");
        let in_a = a.identifier("shared");
        let in_b = b.identifier("shared");
        assert_ne!(in_a, in_b);
        assert_eq!(a.identifier("shared"), in_a);
    }
}
