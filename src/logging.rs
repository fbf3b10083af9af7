//! Log output setup with secret redaction.
//!
//! Every formatted line passes through [`RedactionPatterns`] before it reaches
//! stderr, so bot tokens embedded in request URLs or error messages never end
//! up in logs.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    token_url: Regex,
    token_bare: Regex,
    token_prefixed: Regex,
    api_hash_env: Regex,
    api_hash_field: Regex,
    secrets: Vec<Regex>,
}

impl RedactionPatterns {
    /// Compile all patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/(?:file/)?bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            api_hash_env: Regex::new(r"TELEGRAM_API_HASH=[^\s&]+")?,
            api_hash_field: Regex::new(r#"(telegram_api_hash: Some\(")[^"]*(")"#)?,
            secrets: Vec::new(),
        })
    }

    /// Also mask these exact values wherever they appear.
    ///
    /// # Errors
    ///
    /// Returns an error if an escaped literal fails to compile
    pub fn with_secrets<I>(mut self, secrets: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = String>,
    {
        for secret in secrets {
            if !secret.trim().is_empty() {
                self.secrets.push(Regex::new(&regex::escape(&secret))?);
            }
        }
        Ok(self)
    }

    /// Replace every secret in `input` with a placeholder.
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = self
            .token_url
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_prefixed
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .api_hash_env
            .replace_all(&output, "TELEGRAM_API_HASH=[MASKED]")
            .to_string();
        output = self
            .api_hash_field
            .replace_all(&output, "$1[MASKED]$2")
            .to_string();
        for secret in &self.secrets {
            output = secret.replace_all(&output, "[MASKED]").to_string();
        }
        output
    }
}

/// Writer that redacts secrets before forwarding to the inner writer
pub struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        self.inner.write_all(self.patterns.redact(&s).as_bytes())?;
        // Report the original length; the redacted text may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// [`tracing_subscriber::fmt::MakeWriter`] that redacts everything it writes
pub struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    /// Wrap a writer factory such as `io::stderr`.
    pub const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            patterns: self.patterns.clone(),
        }
    }
}

/// Whether `DEBUG_MODE` asks for verbose logs.
#[must_use]
pub fn debug_mode_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Default filter directive when `RUST_LOG` is not set.
#[must_use]
pub const fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug,hyper=info,reqwest=info"
    } else {
        "info"
    }
}

/// Install the global subscriber: redacted stderr output, `RUST_LOG` first,
/// then `DEBUG_MODE`.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let debug = debug_mode_enabled(std::env::var("DEBUG_MODE").ok().as_deref());
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> RedactionPatterns {
        RedactionPatterns::new().expect("patterns compile")
    }

    #[test]
    fn test_redacts_token_in_api_url() {
        let line = "error sending request for url (https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw/sendVideo)";
        let redacted = patterns().redact(line);
        assert!(!redacted.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
        assert!(redacted.contains("/sendVideo"));
    }

    #[test]
    fn test_redacts_bare_token() {
        let line = "token=1234567890:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq loaded";
        let redacted = patterns().redact(line);
        assert_eq!(redacted, "token=[TELEGRAM_TOKEN] loaded");
    }

    #[test]
    fn test_redacts_api_hash() {
        let p = patterns();
        assert_eq!(
            p.redact("TELEGRAM_API_HASH=0123abcd&x=1"),
            "TELEGRAM_API_HASH=[MASKED]&x=1"
        );
        let debug = r#"Settings { telegram_api_hash: Some("0123abcd"), ytdlp_path: "yt-dlp" }"#;
        let redacted = p.redact(debug);
        assert!(!redacted.contains("0123abcd"));
        assert!(redacted.contains(r#"telegram_api_hash: Some("[MASKED]")"#));
    }

    #[test]
    fn test_configured_secrets_masked_in_any_form() -> Result<(), regex::Error> {
        let p = patterns().with_secrets(vec![
            "d3adb33f.hash+1".to_string(),
            "   ".to_string(),
        ])?;
        assert_eq!(
            p.redact("api hash is d3adb33f.hash+1, retrying"),
            "api hash is [MASKED], retrying"
        );
        // escaped, so `.` and `+` match only themselves
        assert_eq!(p.redact("d3adb33fxhash1"), "d3adb33fxhash1");
        assert_eq!(p.redact("nothing secret"), "nothing secret");
        Ok(())
    }

    #[test]
    fn test_plain_text_untouched() {
        let line = "Download request started kind=audio locator=https://youtu.be/dQw4w9WgXcQ";
        assert_eq!(patterns().redact(line), line);
    }

    #[test]
    fn test_writer_reports_original_length() -> io::Result<()> {
        let mut writer = RedactingWriter {
            inner: Vec::new(),
            patterns: Arc::new(patterns()),
        };
        let input = b"bot1234567890:secretsecret done";
        let written = writer.write(input)?;
        assert_eq!(written, input.len());
        assert_eq!(
            String::from_utf8_lossy(&writer.inner),
            "bot1234567890:[TELEGRAM_TOKEN] done"
        );
        Ok(())
    }

    #[test]
    fn test_debug_mode_parsing() {
        assert!(debug_mode_enabled(Some("true")));
        assert!(debug_mode_enabled(Some(" 1 ")));
        assert!(debug_mode_enabled(Some("YES")));
        assert!(!debug_mode_enabled(Some("false")));
        assert!(!debug_mode_enabled(Some("")));
        assert!(!debug_mode_enabled(None));
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).starts_with("debug"));
    }
}
