#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}

// The browser build starts from the library's wasm entry point instead.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;

    use anyhow::{Context, Result};
    use clap::Parser;
    use vitrine_viewer::cli::Args;
    use vitrine_viewer::headless::run_headless;
    use vitrine_viewer::scene::ContainerSize;

    pub fn main() -> Result<()> {
        let args = Args::parse();

        env_logger::init();

        if args.headless {
            return headless(&args);
        }
        vitrine_viewer::shell::run(&args)
    }

    fn headless(args: &Args) -> Result<()> {
        let config = args
            .viewer_config()
            .context("resolving viewer configuration")?;
        let summary = run_headless(
            config,
            ContainerSize::new(args.width, args.height),
            args.load_request(),
            args.frames,
        )
        .context("running headless viewer")?;

        println!(
            "Headless run: {} frames ({:.0} ms) of {}",
            summary.frames, summary.elapsed_ms, summary.model
        );
        println!(
            "  scene {}, {} vertices, auto-rotate {}",
            summary.content,
            summary.vertex_count,
            if summary.auto_rotate { "on" } else { "off" }
        );
        if let Some(yaw) = summary.model_yaw {
            println!("  model yaw {yaw:.4} rad");
        }
        if let Some(time) = summary.mixer_time {
            println!("  mixer time {time:.3} s");
        }
        let [x, y, z] = summary.camera_position;
        println!("  camera at ({x:.2}, {y:.2}, {z:.2})");

        if let Some(path) = args.summary_json.as_ref() {
            let json =
                serde_json::to_string_pretty(&summary).context("serializing headless summary")?;
            fs::write(path, json)
                .with_context(|| format!("writing summary to {}", path.display()))?;
            println!("Summary written to {}", path.display());
        }
        Ok(())
    }
}
