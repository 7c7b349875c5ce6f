use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use stencil_core::{Field, FieldMapper, OutputFormat};

/// Writes materialized samples either to stdout or one file each.
pub struct SampleWriter {
    format: OutputFormat,
    directory: Option<PathBuf>,
}

impl SampleWriter {
    pub fn new(format: OutputFormat, directory: Option<PathBuf>) -> Result<Self, anyhow::Error> {
        if let Some(dir) = &directory {
            fs::create_dir_all(dir).map_err(|e| {
                anyhow::anyhow!("Failed to create output directory {:?}: {}", dir, e)
            })?;
        }
        Ok(Self { format, directory })
    }

    pub fn write(
        &self,
        index: u64,
        field: &Field,
        mapper: &FieldMapper,
    ) -> Result<(), anyhow::Error> {
        let encoded = encode(self.format, field, mapper)?;
        match &self.directory {
            Some(dir) => {
                let path = sample_path(dir, index, self.format);
                fs::write(&path, &encoded)
                    .map_err(|e| anyhow::anyhow!("Failed to write sample {:?}: {}", path, e))?;
                log::debug!("wrote sample {index} to {path:?}");
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&encoded)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

pub fn encode(
    format: OutputFormat,
    field: &Field,
    mapper: &FieldMapper,
) -> Result<Vec<u8>, anyhow::Error> {
    Ok(match format {
        OutputFormat::Raw => field.to_bytes(),
        OutputFormat::Hex => {
            let mut line = hex::encode(field.to_bytes()).into_bytes();
            line.push(b'\n');
            line
        }
        OutputFormat::Json => {
            let mut text = serde_json::to_vec_pretty(&field.to_json(mapper))?;
            text.push(b'\n');
            text
        }
    })
}

fn sample_path(dir: &Path, index: u64, format: OutputFormat) -> PathBuf {
    let extension = match format {
        OutputFormat::Raw => "bin",
        OutputFormat::Hex => "hex",
        OutputFormat::Json => "json",
    };
    dir.join(format!("sample_{index:06}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::FieldKind;

    fn sample(mapper: &mut FieldMapper) -> Field {
        let id = mapper.find_or_register("magic");
        Field::group(
            None,
            FieldKind::Compound,
            vec![Field::terminal(Some(id), FieldKind::Block, vec![0xde, 0xad])],
        )
    }

    #[test]
    fn encodes_each_format() {
        let mut mapper = FieldMapper::new();
        let field = sample(&mut mapper);
        assert_eq!(encode(OutputFormat::Raw, &field, &mapper).unwrap(), vec![0xde, 0xad]);
        assert_eq!(
            encode(OutputFormat::Hex, &field, &mapper).unwrap(),
            b"dead\n".to_vec()
        );
        let json: serde_json::Value =
            serde_json::from_slice(&encode(OutputFormat::Json, &field, &mapper).unwrap())
                .unwrap();
        assert_eq!(json["children"][0]["name"], "magic");
        assert_eq!(json["children"][0]["bytes"][1], 0xad);
    }

    #[test]
    fn writes_one_file_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let writer = SampleWriter::new(OutputFormat::Raw, Some(target.clone())).unwrap();
        let mut mapper = FieldMapper::new();
        let field = sample(&mut mapper);
        writer.write(0, &field, &mapper).unwrap();
        writer.write(1, &field, &mapper).unwrap();

        assert_eq!(fs::read(target.join("sample_000000.bin")).unwrap(), vec![0xde, 0xad]);
        assert!(target.join("sample_000001.bin").exists());
    }
}
