use crate::errors::{JobError, Result};
use crate::types::{Args, JobPlan};
use std::path::{Component, Path, PathBuf};

/// A raw job request as it arrives from a client.
///
/// Empty or whitespace-only fields are treated as absent.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    /// Handle of a previously uploaded file inside the storage directory.
    pub file_id: Option<String>,
    /// A user-supplied path or URL, used when no upload handle is given.
    pub target_path: Option<String>,
    /// Free-form tool options, shell-quoted.
    pub options: Option<String>,
    /// Tee file name, relative to the storage directory.
    pub output_filename: Option<String>,
}

impl Submission {
    /// Validate the request and assemble the command line for `tool`.
    ///
    /// Uploaded handles and output filenames are resolved against `storage`.
    pub fn plan(&self, tool: &str, storage: &Path) -> Result<JobPlan> {
        let file_id = present(&self.file_id);
        let target_path = present(&self.target_path);
        let options = present(&self.options);

        if options.is_none() && file_id.is_none() && target_path.is_none() {
            return Err(JobError::InvalidRequest(
                "No command, target file, or target path provided.".into(),
            ));
        }

        let target = match (file_id, target_path) {
            (Some(file_id), _) => Some(resolve_upload(storage, file_id)?),
            (None, Some(path)) => Some(path.to_string()),
            (None, None) => None,
        };

        let tokens = match options {
            Some(options) => tokenize(options)?,
            None => Vec::new(),
        };
        let argv = assemble(tool, tokens, target.as_deref());

        let tee = match present(&self.output_filename) {
            Some(name) => Some(resolve_output(storage, name)?),
            None => None,
        };

        let mut argv = argv.into_iter();
        let program = argv.next().unwrap_or_else(|| tool.to_string());
        Ok(JobPlan {
            program,
            args: argv.collect(),
            tee,
        })
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Split an options string using POSIX shell quoting rules.
pub fn tokenize(options: &str) -> Result<Args> {
    shlex::split(options)
        .ok_or_else(|| JobError::InvalidRequest(format!("Unbalanced quotes in options: {options}")))
}

/// Build the final argument vector from the tokenized options.
///
/// The tool name is prepended unless it already is the first token. The
/// target is appended unless some token is exactly equal to it; a target
/// that only appears inside another argument is still appended.
pub fn assemble(tool: &str, tokens: Args, target: Option<&str>) -> Args {
    let mut argv = Vec::with_capacity(tokens.len() + 2);
    if tokens.first().map(String::as_str) != Some(tool) {
        argv.push(tool.to_string());
    }
    argv.extend(tokens);
    if let Some(target) = target {
        if !argv.iter().any(|arg| arg == target) {
            argv.push(target.to_string());
        }
    }
    argv
}

fn resolve_upload(storage: &Path, file_id: &str) -> Result<String> {
    let not_found = || JobError::NotFound(format!("Uploaded file {file_id}"));
    let relative = Path::new(file_id);
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(not_found()),
    }
    let path = storage.join(relative);
    if !path.is_file() {
        return Err(not_found());
    }
    Ok(path.to_string_lossy().into_owned())
}

fn resolve_output(storage: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let contained = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !contained {
        return Err(JobError::InvalidRequest(format!(
            "Output filename must stay inside the upload directory: {name}"
        )));
    }
    Ok(storage.join(relative))
}
