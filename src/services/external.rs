//! Subprocess-backed capabilities.
//!
//! The actual texture codec and image-generation client are separate programs;
//! these adapters run them with `tokio::process`, substituting placeholders in
//! the configured argument list:
//!
//! | Placeholder    | Value                                     |
//! |----------------|-------------------------------------------|
//! | `{input}`      | source image path                         |
//! | `{output}`     | file the program must write               |
//! | `{output_dir}` | directory containing `{output}`           |
//! | `{format}`     | target extension (`dds` / `png`)          |
//! | `{size}`       | edge length in pixels (`2048` / `4096`)   |
//! | `{resolution}` | resolution label (`2K` / `4K`)            |
//! | `{prompt}`     | style description (restyler only)         |
//!
//! Each placeholder is substituted inside a single argument, so prompts with
//! spaces or quotes never need shell escaping.

use super::capabilities::{RestyleError, Restyler, TextureFormat, TranscodeError, Transcoder};
use crate::models::{CommandTemplate, Resolution};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Output;
use std::time::Instant;
use tokio::process::Command;

/// Exit code (`EX_TEMPFAIL`) the restyle program uses to signal rate limiting
pub const QUOTA_EXIT_CODE: i32 = 75;

/// Environment variable carrying the API key to the restyle program
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// File name the restyled image is written to
pub const RESTYLED_FILE_NAME: &str = "restyled.png";

/// Substitute `{name}` placeholders in every argument
pub fn render_args(args: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        })
        .collect()
}

async fn run_template(
    template: &CommandTemplate,
    args: Vec<String>,
    extra_env: &[(&str, &str)],
) -> std::io::Result<Output> {
    tracing::info!("Executing: {} {}", template.program, args.join(" "));
    let start = Instant::now();

    let mut cmd = Command::new(&template.program);
    cmd.args(&args)
        .envs(template.env.iter())
        .envs(extra_env.iter().copied())
        .kill_on_drop(true);

    let output = cmd.output().await?;

    tracing::info!(
        "{} completed in {:.2}s with exit code {}",
        template.program,
        start.elapsed().as_secs_f32(),
        output.status.code().unwrap_or(-1)
    );

    Ok(output)
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.to_string()
    }
}

/// [`Transcoder`] running an external image converter (ImageMagick by default)
#[derive(Debug, Clone)]
pub struct CommandTranscoder {
    template: CommandTemplate,
}

impl CommandTranscoder {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }
}

#[async_trait]
impl Transcoder for CommandTranscoder {
    async fn transcode(
        &self,
        input: &Utf8Path,
        output: &Utf8Path,
        format: TextureFormat,
        resolution: Resolution,
    ) -> Result<(), TranscodeError> {
        let size = resolution.pixels().to_string();
        let output_dir = output.parent().map(Utf8Path::as_str).unwrap_or(".");
        let args = render_args(
            &self.template.args,
            &[
                ("input", input.as_str()),
                ("output", output.as_str()),
                ("output_dir", output_dir),
                ("format", format.extension()),
                ("size", size.as_str()),
                ("resolution", resolution.as_str()),
            ],
        );

        let result = run_template(&self.template, args, &[]).await?;
        if !result.status.success() {
            return Err(TranscodeError::Failed {
                code: result.status.code(),
                message: failure_message(&result),
            });
        }
        if !output.is_file() {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}

/// [`Restyler`] running an external image-generation client
#[derive(Clone)]
pub struct CommandRestyler {
    template: CommandTemplate,
    api_key: String,
}

impl CommandRestyler {
    pub fn new(template: CommandTemplate, api_key: impl Into<String>) -> Self {
        Self {
            template,
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for CommandRestyler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRestyler")
            .field("template", &self.template)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Restyler for CommandRestyler {
    async fn restyle(
        &self,
        base_image: &Utf8Path,
        style: &str,
        resolution: Resolution,
        output_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, RestyleError> {
        let output = output_dir.join(RESTYLED_FILE_NAME);
        let size = resolution.pixels().to_string();
        let args = render_args(
            &self.template.args,
            &[
                ("input", base_image.as_str()),
                ("output", output.as_str()),
                ("output_dir", output_dir.as_str()),
                ("format", TextureFormat::Png.extension()),
                ("size", size.as_str()),
                ("resolution", resolution.as_str()),
                ("prompt", style),
            ],
        );

        let result = run_template(&self.template, args, &[(API_KEY_ENV, self.api_key.as_str())])
            .await
            .map_err(|e| {
                RestyleError::Generation(format!("failed to start {}: {}", self.template.program, e))
            })?;

        match result.status.code() {
            Some(0) => {}
            Some(QUOTA_EXIT_CODE) => return Err(RestyleError::Quota(failure_message(&result))),
            code => {
                return Err(RestyleError::Generation(format!(
                    "{} exited with {:?}: {}",
                    self.template.program,
                    code,
                    failure_message(&result)
                )));
            }
        }

        if !output.is_file() {
            return Err(RestyleError::Generation(format!(
                "{} did not write {}",
                self.template.program, output
            )));
        }
        Ok(output)
    }
}
