// ffmpeg subprocess encoder

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::{EncoderError, EncoderResult};
use super::{AssembleRequest, Encoder};

/// Encoder that shells out to an ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::with_program("ffmpeg")
    }
}

impl FfmpegEncoder {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Fail unless `<program> -version` runs successfully
    pub async fn check_installed(&self) -> EncoderResult<()> {
        let status = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| EncoderError::NotInstalled {
                program: self.program_name(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(EncoderError::NotInstalled {
                program: self.program_name(),
                reason: format!("`-version` exited with {}", status),
            })
        }
    }

    /// Arguments that decode a raw H.264 stream from stdin into one image
    pub fn still_args(output: &Path) -> Vec<String> {
        vec![
            "-f".into(),
            "h264".into(),
            "-i".into(),
            "pipe:0".into(),
            "-update".into(),
            "1".into(),
            "-frames:v".into(),
            "1".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Arguments that encode a concat script read from stdin
    pub fn timelapse_args(request: &AssembleRequest) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        if request.overwrite {
            args.push("-y".into());
        }
        args.extend(
            ["-f", "concat", "-protocol_whitelist", "file,pipe", "-safe", "0", "-i", "pipe:0"]
                .map(String::from),
        );
        args.extend(["-c:v", "libx264"].map(String::from));
        if let Some(filter) = request.crop.filter() {
            args.push("-vf".into());
            args.push(filter);
        }
        args.extend(
            ["-preset", "slow", "-crf", "18", "-tune", "stillimage", "-pix_fmt", "yuv420p"]
                .map(String::from),
        );
        args.push(request.output.to_string_lossy().into_owned());
        args
    }

    async fn run(&self, operation: &'static str, args: &[String], input: Bytes) -> EncoderResult<Output> {
        log::debug!("Running {} {}", self.program_name(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EncoderError::NotInstalled {
                program: self.program_name(),
                reason: e.to_string(),
            })?;

        // Feed stdin concurrently so a full stderr pipe cannot stall the child
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    log::debug!("Encoder closed its input early: {}", e);
                }
            })
        });

        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            let _ = writer.await;
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!("{} failed: {}", operation, stderr);
            return Err(EncoderError::Failed {
                operation,
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn extract_still(&self, buffer: Bytes, output: &Path) -> EncoderResult<()> {
        if buffer.is_empty() {
            return Err(EncoderError::EmptyInput("no H.264 data to decode".to_string()));
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.run("Frame extraction", &Self::still_args(output), buffer)
            .await?;
        log::info!("Extracted first frame to: {}", output.display());
        Ok(())
    }

    async fn assemble(&self, script: String, request: &AssembleRequest) -> EncoderResult<()> {
        if script.trim().is_empty() {
            return Err(EncoderError::EmptyInput("concat script has no frames".to_string()));
        }
        if !request.overwrite && request.output.exists() {
            return Err(EncoderError::OutputExists(request.output.clone()));
        }

        self.run(
            "Timelapse encoding",
            &Self::timelapse_args(request),
            Bytes::from(script),
        )
        .await?;
        log::info!("Timelapse generated: {}", request.output.display());
        Ok(())
    }
}
