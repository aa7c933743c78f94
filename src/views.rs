//! HTML templates
//!
//! Pages are plain HTML with `{{ name }}` placeholders. Templates are read
//! from the configured directory once at startup; a missing file falls back
//! to the copy compiled into the binary.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{AppError, Result};

pub const LOGIN_TEMPLATE: &str = "index.html";
pub const HOME_TEMPLATE: &str = "home.html";

const BUILTIN_LOGIN: &str = include_str!("../template/index.html");
const BUILTIN_HOME: &str = include_str!("../template/home.html");

/// Loaded page templates
#[derive(Debug, Clone)]
pub struct Templates {
    login: String,
    home: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            login: BUILTIN_LOGIN.to_string(),
            home: BUILTIN_HOME.to_string(),
        }
    }
}

impl Templates {
    /// Load templates from `dir`
    ///
    /// # Errors
    /// Returns error if a template file exists but cannot be read
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            login: load_or_builtin(dir, LOGIN_TEMPLATE, BUILTIN_LOGIN)?,
            home: load_or_builtin(dir, HOME_TEMPLATE, BUILTIN_HOME)?,
        })
    }

    /// Render the login form
    pub fn render_login(&self) -> Result<String> {
        render(&self.login, &HashMap::new())
    }

    /// Render the home view for `user_name`
    pub fn render_home(&self, user_name: &str) -> Result<String> {
        let vars = HashMap::from([("userName", user_name)]);
        render(&self.home, &vars)
    }
}

fn load_or_builtin(dir: &Path, file: &str, builtin: &str) -> Result<String> {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            tracing::debug!(path = %path.display(), "Loaded template");
            Ok(contents)
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Template not found; using built-in copy");
            Ok(builtin.to_string())
        }
        Err(error) => Err(AppError::Template(format!(
            "failed to read {}: {}",
            path.display(),
            error
        ))),
    }
}

/// Substitute `{{ name }}` placeholders with HTML-escaped values
///
/// # Errors
/// Fails on an unclosed placeholder or a name missing from `vars`
pub fn render(template: &str, vars: &HashMap<&str, &str>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| AppError::Template("unclosed placeholder".to_string()))?;

        let name = after[..end].trim();
        let value = vars
            .get(name)
            .ok_or_else(|| AppError::Template(format!("unknown placeholder `{name}`")))?;
        html_escape::encode_text_to_string(value, &mut out);

        rest = &after[end + 2..];
    }
    out.push_str(rest);

    Ok(out)
}
