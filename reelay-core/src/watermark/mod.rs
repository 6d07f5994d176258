mod error;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::config::WatermarkConfig;

pub use error::{TranscodeError, TranscodeResult};

/// Burns the brand label and one overlay caption line into a media file,
/// producing a new file. The input is never mutated in place.
#[async_trait]
pub trait Overlayer: Send + Sync {
    async fn apply(&self, input: &Path, overlay_text: &str) -> TranscodeResult<PathBuf>;
}

/// Escapes characters the drawtext filter treats as syntax so pool text
/// always renders literally. Backslash must go first or it would re-escape
/// the escapes themselves.
pub fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | ':' | '\'' | '"' | ',' | ';' | '%' | '[' | ']' | '=' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub struct FfmpegWatermarker {
    config: WatermarkConfig,
    runner: Arc<dyn CommandRunner>,
}

impl FfmpegWatermarker {
    pub fn new(config: WatermarkConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// The full `-vf` filtergraph: boxed brand label bottom-right, the
    /// overlay line centered low and time-windowed, then a slight crop.
    pub fn build_filtergraph(&self, overlay_text: &str) -> String {
        let brand = &self.config.brand;
        let overlay = &self.config.overlay;
        let crop = self.config.frame.crop_factor;

        let brand_filter = format!(
            "drawtext=fontfile={fontfile}:text='{text}':fontsize={size}:fontcolor={color}:\
             x=(w-text_w)-{mx}:y=(h-text_h)-{my}:box=1:boxcolor={boxcolor}:boxborderw={boxborderw}",
            fontfile = brand.fontfile,
            text = escape_drawtext(&brand.text),
            size = brand.fontsize,
            color = brand.fontcolor,
            mx = brand.margin_x,
            my = brand.margin_y,
            boxcolor = brand.boxcolor,
            boxborderw = brand.boxborderw,
        );
        let overlay_filter = format!(
            "drawtext=fontfile={fontfile}:text='{text}':fontsize={size}:fontcolor={color}:\
             borderw={borderw}:bordercolor={bordercolor}:x=(w-text_w)/2:y=(h-text_h)/1.1:\
             enable='between(t,{start},{end})'",
            fontfile = overlay.fontfile,
            text = escape_drawtext(overlay_text),
            size = overlay.fontsize,
            color = overlay.fontcolor,
            borderw = overlay.borderw,
            bordercolor = overlay.bordercolor,
            start = overlay.enable_start_s,
            end = overlay.enable_end_s,
        );
        let crop_filter = format!("crop=iw*{crop}:ih*{crop}");

        format!("{brand_filter},{overlay_filter},{crop_filter}")
    }

    fn build_args(&self, input: &Path, output: &Path, filtergraph: &str) -> Vec<String> {
        let ffmpeg = &self.config.ffmpeg;
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-vf".to_string(),
            filtergraph.to_string(),
            "-preset".to_string(),
            ffmpeg.preset.clone(),
            "-threads".to_string(),
            ffmpeg.threads.to_string(),
            "-max_muxing_queue_size".to_string(),
            ffmpeg.max_muxing_queue_size.to_string(),
            output.display().to_string(),
        ]
    }

    async fn discard_output(&self, output: &Path) {
        match fs::remove_file(output).await {
            Ok(()) => warn!(path = %output.display(), "discarded incomplete transcode output"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %output.display(), error = %err, "failed to remove transcode output")
            }
        }
    }
}

/// `clip.mp4` -> `clip_wm.mp4`, always next to the input.
fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    input.with_file_name(format!("{stem}_wm.{extension}"))
}

#[async_trait]
impl Overlayer for FfmpegWatermarker {
    async fn apply(&self, input: &Path, overlay_text: &str) -> TranscodeResult<PathBuf> {
        let output = output_path(input);
        let filtergraph = self.build_filtergraph(overlay_text);
        let args = self.build_args(input, &output, &filtergraph);
        let binary = PathBuf::from(&self.config.ffmpeg.binary);
        let time_limit = Duration::from_secs(self.config.ffmpeg.timeout_seconds);

        let result = self.runner.run(&binary, &args, time_limit).await;
        let command_output = match result {
            Ok(command_output) => command_output,
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                self.discard_output(&output).await;
                return Err(TranscodeError::Timeout(input.to_path_buf()));
            }
            Err(err) => {
                self.discard_output(&output).await;
                return Err(TranscodeError::Launch(err.to_string()));
            }
        };

        if !command_output.success {
            self.discard_output(&output).await;
            return Err(TranscodeError::Tool {
                code: command_output.code,
                stderr: command_output.stderr,
            });
        }
        if !output.exists() {
            return Err(TranscodeError::MissingOutput(output));
        }
        info!(input = %input.display(), output = %output.display(), "watermark applied");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::config::{BrandSection, FfmpegSection, FrameSection, OverlaySection};
    use tempfile::tempdir;

    fn config() -> WatermarkConfig {
        WatermarkConfig {
            ffmpeg: FfmpegSection {
                binary: "ffmpeg".to_string(),
                preset: "veryfast".to_string(),
                threads: 1,
                max_muxing_queue_size: 1024,
                timeout_seconds: 120,
            },
            brand: BrandSection {
                text: "ig/reelay".to_string(),
                fontfile: "fonts/brand.ttf".to_string(),
                fontsize: 24,
                fontcolor: "black".to_string(),
                boxcolor: "white@1.0".to_string(),
                boxborderw: 5,
                margin_x: 10,
                margin_y: 20,
            },
            overlay: OverlaySection {
                fontfile: "fonts/overlay.ttf".to_string(),
                fontsize: 30,
                fontcolor: "white".to_string(),
                borderw: 2,
                bordercolor: "black".to_string(),
                enable_start_s: 1.0,
                enable_end_s: 2.0,
            },
            frame: FrameSection { crop_factor: 0.98 },
        }
    }

    fn watermarker(runner: Arc<dyn CommandRunner>) -> FfmpegWatermarker {
        FfmpegWatermarker::new(config(), runner)
    }

    struct WritingRunner {
        succeed: bool,
    }

    #[async_trait]
    impl CommandRunner for WritingRunner {
        async fn run(
            &self,
            _program: &Path,
            args: &[String],
            _time_limit: Duration,
        ) -> io::Result<CommandOutput> {
            if self.succeed {
                // last arg is the output path
                std::fs::write(args.last().unwrap(), b"watermarked").unwrap();
                Ok(CommandOutput::ok(""))
            } else {
                Ok(CommandOutput::failed(1, "filter parse error"))
            }
        }
    }

    #[test]
    fn control_characters_are_escaped_literally() {
        let text = r#"deal: 50% off \ "now", [hurry]"#;
        let escaped = escape_drawtext(text);
        assert!(escaped.contains(r"\:"));
        assert!(escaped.contains(r"\\"));
        assert!(escaped.contains(r#"\""#));
        assert!(escaped.contains(r"\%"));
        assert!(escaped.contains(r"\,"));
        assert!(escaped.contains(r"\["));
        // nothing unescaped survives
        assert!(!escaped.contains(r#"off \ ""#));
    }

    #[test]
    fn filtergraph_carries_escaped_overlay_text() {
        let wm = watermarker(Arc::new(WritingRunner { succeed: true }));
        let graph = wm.build_filtergraph(r#"it's 100%: "wild" \o/"#);
        assert!(graph.contains(r"it\'s 100\%\:"));
        assert!(graph.contains(r#"\"wild\""#));
        assert!(graph.contains(r"\\o/"));
        // structure: brand box, windowed overlay, crop
        assert!(graph.contains("boxcolor=white@1.0"));
        assert!(graph.contains("enable='between(t,1,2)'"));
        assert!(graph.ends_with("crop=iw*0.98:ih*0.98"));
    }

    #[tokio::test]
    async fn apply_writes_a_sibling_and_keeps_the_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"raw").unwrap();

        let wm = watermarker(Arc::new(WritingRunner { succeed: true }));
        let output = wm.apply(&input, "hello").await.unwrap();
        assert_eq!(output, dir.path().join("clip_wm.mp4"));
        assert_ne!(output, input);
        assert_eq!(std::fs::read(&input).unwrap(), b"raw");
        assert!(output.exists());
    }

    #[tokio::test]
    async fn tool_failure_is_a_transcode_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"raw").unwrap();

        let wm = watermarker(Arc::new(WritingRunner { succeed: false }));
        let err = wm.apply(&input, "hello").await.unwrap_err();
        assert!(matches!(err, TranscodeError::Tool { code: Some(1), .. }));
        assert!(!dir.path().join("clip_wm.mp4").exists());
    }
}
