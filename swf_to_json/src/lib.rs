use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::ValueEnum;
use swf_scene::{
    SceneOptions,
    bitmap::{BitmapPayload, ImageFormat},
};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    #[value(name = "msgpack")]
    MsgPack,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MsgPack => "msgpack",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    pub scene: SceneOptions,
    pub format: OutputFormat,
    pub pretty: bool,
    /// Also write JPEG/PNG/GIF bitmap payloads next to the scene file.
    pub extract_bitmaps: bool,
}

/// Decodes `file_path` and writes its scene into `output` (the input's
/// directory when absent). Returns the written scene file.
pub fn export_swf(file_path: &Path, output: Option<&Path>, options: &ExportOptions) -> anyhow::Result<PathBuf> {
    let data = std::fs::read(file_path).with_context(|| format!("读取 {} 失败", file_path.display()))?;
    let swf_buf = swf_scene::decompress_swf(&data)?;
    let movie = swf_scene::parse_movie(&swf_buf)?;
    let scene = swf_scene::build_scene(&movie, &options.scene)?;
    for warning in &scene.warnings {
        warn!(
            "tag #{} (code {}): {}",
            warning.position, warning.tag_code, warning.message
        );
    }
    info!(
        "{}: {}x{} px, {} 帧, {} 个图形, {} 个影片剪辑",
        file_path.display(),
        scene.width,
        scene.height,
        scene.root.frames.len(),
        scene.shapes.len(),
        scene.sprites.len()
    );

    let output = match output {
        Some(output) => output.to_path_buf(),
        None => file_path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    // 判断路径是否存在，如果不存在则创建
    if !output.as_os_str().is_empty() && !output.exists() {
        std::fs::create_dir_all(&output)?;
    }
    let file_stem = file_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("scene");

    let scene_path = output.join(format!("{}.{}", file_stem, options.format.extension()));
    let mut writer = BufWriter::new(File::create(&scene_path)?);
    match (options.format, options.pretty) {
        (OutputFormat::Json, false) => serde_json::to_writer(&mut writer, &scene)?,
        (OutputFormat::Json, true) => serde_json::to_writer_pretty(&mut writer, &scene)?,
        (OutputFormat::MsgPack, _) => rmp_serde::encode::write_named(&mut writer, &scene)?,
    }
    writer.flush()?;

    if options.extract_bitmaps {
        let bitmap_dir = output.join(format!("{}_bitmaps", file_stem));
        std::fs::create_dir_all(&bitmap_dir)?;
        for bitmap in &scene.bitmaps {
            write_bitmap(&bitmap_dir, bitmap)?;
        }
    }
    Ok(scene_path)
}

fn write_bitmap(dir: &Path, bitmap: &BitmapPayload<'_>) -> anyhow::Result<()> {
    let extension = match bitmap.format {
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::Lossless | ImageFormat::Unknown => {
            info!("跳过位图 {} ({:?})", bitmap.id, bitmap.format);
            return Ok(());
        }
    };
    std::fs::write(
        dir.join(format!("{}.{}", bitmap.id, extension)),
        bitmap.image_bytes(),
    )?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    /// A one-frame movie with a zero-sized stage.
    fn minimal_swf() -> Vec<u8> {
        let mut bytes = b"FWS\x0a".to_vec();
        bytes.extend_from_slice(&17u32.to_le_bytes());
        bytes.push(0x00);
        bytes.extend_from_slice(&[0x00, 0x18, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x40, 0x00, 0x00, 0x00]);
        bytes
    }

    fn temp_dir(name: &str) -> anyhow::Result<PathBuf> {
        let dir = std::env::temp_dir().join(format!("swf_to_json_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    #[test]
    fn writes_json_next_to_the_input() -> anyhow::Result<()> {
        let dir = temp_dir("json")?;
        let input = dir.join("movie.swf");
        std::fs::write(&input, minimal_swf())?;

        let path = export_swf(&input, None, &ExportOptions::default())?;
        assert_eq!(path, dir.join("movie.json"));
        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(json["header"]["num_frames"], 1);
        assert_eq!(json["header"]["frame_rate"], 24.0);
        assert_eq!(json["root"]["frames"].as_array().map(Vec::len), Some(1));
        assert!(json["warnings"].as_array().is_some_and(Vec::is_empty));

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn writes_msgpack_into_the_output_dir() -> anyhow::Result<()> {
        let dir = temp_dir("msgpack")?;
        let input = dir.join("movie.swf");
        std::fs::write(&input, minimal_swf())?;
        let output = dir.join("out");

        let options = ExportOptions {
            format: OutputFormat::MsgPack,
            ..Default::default()
        };
        let path = export_swf(&input, Some(&output), &options)?;
        assert_eq!(path, output.join("movie.msgpack"));
        let value: serde_json::Value = rmp_serde::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(value["header"]["version"], 10);

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn rejects_files_that_are_not_swf() -> anyhow::Result<()> {
        let dir = temp_dir("invalid")?;
        let input = dir.join("movie.swf");
        std::fs::write(&input, b"not a movie")?;

        let error = export_swf(&input, None, &ExportOptions::default()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<swf_scene::Error>(),
            Some(swf_scene::Error::InvalidSignature)
        ));

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}
