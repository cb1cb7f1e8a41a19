use std::{env, path::PathBuf};

use clap::Parser;
use swf_scene::SceneOptions;
use swf_to_json::{ExportOptions, OutputFormat, export_swf};
use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 输入的swf文件名
    file_path: PathBuf,
    /// 输出的目录，默认与输入文件相同
    output: Option<PathBuf>,
    /// 每个输出单位对应的像素数（例如每米像素数），默认为1即输出像素
    #[arg(short, long, default_value = "1.0")]
    scale: f32,
    /// 输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// 格式化 JSON 输出
    #[arg(long)]
    pretty: bool,
    /// 只输出边表，不拼接路径
    #[arg(long)]
    no_paths: bool,
    /// 同时导出 JPEG/PNG/GIF 位图
    #[arg(long)]
    bitmaps: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if !(args.scale > 0.0) {
        anyhow::bail!("--scale 必须大于 0");
    }

    let env_filter = tracing_subscriber::EnvFilter::builder().parse_lossy(
        env::var("RUST_LOG")
            .as_deref()
            .unwrap_or("error,swf_to_json=info,swf_scene=warn"),
    );
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    let options = ExportOptions {
        scene: SceneOptions {
            units_per_twip: 1.0 / (20.0 * args.scale),
            build_paths: !args.no_paths,
        },
        format: args.format,
        pretty: args.pretty,
        extract_bitmaps: args.bitmaps,
    };
    match export_swf(&args.file_path, args.output.as_deref(), &options) {
        Ok(path) => {
            info!("已写入 {}", path.display());
            Ok(())
        }
        Err(e) => {
            error!("{}: {:#}", args.file_path.display(), e);
            Err(e)
        }
    }
}
