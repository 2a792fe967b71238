//! Prompt templates.
//!
//! A template is plain text with three escapes: `\u` (user name), `\h` (host
//! name) and `\w` (working directory). Substituted values are never scanned
//! again, and any other backslash sequence is kept as written.

use nix::unistd::gethostname;
use std::env;

/// The prompt used when no template is set.
pub const DEFAULT_PROMPT: &str = "vush$ ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placeholder {
    User,
    Host,
    WorkingDir,
}

impl Placeholder {
    fn from_escape(escape: char) -> Option<Self> {
        match escape {
            'u' => Some(Placeholder::User),
            'h' => Some(Placeholder::Host),
            'w' => Some(Placeholder::WorkingDir),
            _ => None,
        }
    }
}

/// The values substituted into a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptContext {
    pub user: String,
    pub host: String,
    pub cwd:  String,
}

impl PromptContext {
    /// Collects the values from the running process.
    pub fn current() -> Self {
        let user = users::get_current_username()
            .map_or_else(|| "?".into(), |name| name.to_string_lossy().into_owned());
        let host =
            gethostname().map_or_else(|_| "?".into(), |name| name.to_string_lossy().into_owned());
        let cwd = env::current_dir()
            .map_or_else(|_| "?".into(), |path| path.to_string_lossy().into_owned());
        PromptContext { user, host, cwd }
    }

    fn value(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::User => &self.user,
            Placeholder::Host => &self.host,
            Placeholder::WorkingDir => &self.cwd,
        }
    }
}

pub struct Prompt;

impl Prompt {
    /// Expands every placeholder of `template` in a single pass.
    pub fn render(template: &str, context: &PromptContext) -> String {
        let mut output = String::with_capacity(template.len() + context.cwd.len());
        let mut chars = template.chars().peekable();
        while let Some(character) = chars.next() {
            if character != '\\' {
                output.push(character);
                continue;
            }
            match chars.peek().copied().and_then(Placeholder::from_escape) {
                Some(placeholder) => {
                    chars.next();
                    output.push_str(context.value(placeholder));
                }
                None => output.push('\\'),
            }
        }
        output
    }
}
