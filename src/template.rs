//! Token substitution for the shell-archive scripts.
//!
//! The `extract` and `launcher` templates are plain shell scripts carrying
//! `@TOKEN@` placeholders. Rendering replaces each placeholder everywhere it
//! appears and leaves all other text untouched.

use crate::error::{ArchiveError, Result};
use camino::Utf8Path;

/// Values substituted into the script templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTokens {
    /// `@GENERATOR@`: the tool that produced the archive.
    pub generator: String,
    /// `@ARCHIVE@`: base name of the output file.
    pub archive: String,
    /// `@DATE@`: build timestamp.
    pub date: String,
    /// `@USER@`: the invoking user.
    pub user: String,
    /// `@VERSION@`
    pub version: String,
    /// `@RELEASE@`
    pub release: String,
    /// `@DECODER@`: the command that reverses the payload encoding.
    pub decoder: String,
}

impl TemplateTokens {
    fn pairs(&self) -> [(&'static str, &str); 7] {
        [
            ("@GENERATOR@", self.generator.as_str()),
            ("@ARCHIVE@", self.archive.as_str()),
            ("@DATE@", self.date.as_str()),
            ("@USER@", self.user.as_str()),
            ("@VERSION@", self.version.as_str()),
            ("@RELEASE@", self.release.as_str()),
            ("@DECODER@", self.decoder.as_str()),
        ]
    }

    /// Substitute every token in `template`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rerun_archive::template::TemplateTokens;
    ///
    /// let tokens = TemplateTokens {
    ///     version: "1.2.0".to_owned(),
    ///     decoder: "openssl enc -base64 -d".to_owned(),
    ///     ..TemplateTokens::default()
    /// };
    /// assert_eq!(
    ///     tokens.render("v@VERSION@ | @DECODER@"),
    ///     "v1.2.0 | openssl enc -base64 -d"
    /// );
    /// ```
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        self.pairs()
            .into_iter()
            .fold(template.to_owned(), |text, (token, value)| {
                text.replace(token, value)
            })
    }
}

/// Read the template called `name` from `template_dir`.
///
/// # Errors
///
/// Returns [`ArchiveError::TemplateNotFound`] if it cannot be read.
pub fn read_template(template_dir: &Utf8Path, name: &str) -> Result<String> {
    let path = template_dir.join(name);
    std::fs::read_to_string(&path).map_err(|_| ArchiveError::TemplateNotFound { path })
}

/// Render template `name` from `template_dir` into `dest`.
///
/// # Errors
///
/// Returns [`ArchiveError::TemplateNotFound`] or [`ArchiveError::Io`].
pub fn render_to(
    template_dir: &Utf8Path,
    name: &str,
    tokens: &TemplateTokens,
    dest: &Utf8Path,
) -> Result<()> {
    let rendered = tokens.render(&read_template(template_dir, name)?);
    std::fs::write(dest, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn tokens() -> TemplateTokens {
        TemplateTokens {
            generator: "rerun-archive".to_owned(),
            archive: "rerun.sh".to_owned(),
            date: "2024-03-01".to_owned(),
            user: "alice".to_owned(),
            version: "1.2.0".to_owned(),
            release: "1".to_owned(),
            decoder: "uudecode -p".to_owned(),
        }
    }

    #[test]
    fn render_replaces_all_seven_tokens() {
        let template = "@GENERATOR@ @ARCHIVE@ @DATE@ @USER@ @VERSION@ @RELEASE@ @DECODER@";
        assert_eq!(
            tokens().render(template),
            "rerun-archive rerun.sh 2024-03-01 alice 1.2.0 1 uudecode -p"
        );
    }

    #[test]
    fn render_replaces_repeated_tokens_and_keeps_other_text() {
        let rendered = tokens().render("# @VERSION@\necho @VERSION@ $HOME @UNKNOWN@\n");
        assert_eq!(rendered, "# 1.2.0\necho 1.2.0 $HOME @UNKNOWN@\n");
    }

    #[test]
    fn missing_template_is_reported_with_its_path() {
        let temp = TempDir::new().expect("temp dir");
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");

        let err = read_template(&dir, "launcher").expect_err("no template");
        assert!(matches!(err, ArchiveError::TemplateNotFound { path } if path == dir.join("launcher")));
    }

    #[test]
    fn render_to_writes_substituted_file() {
        let temp = TempDir::new().expect("temp dir");
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");
        std::fs::write(dir.join("extract"), "VERSION=@VERSION@\n").expect("write template");

        let dest = dir.join("out");
        render_to(&dir, "extract", &tokens(), &dest).expect("render");
        assert_eq!(std::fs::read_to_string(dest).expect("read"), "VERSION=1.2.0\n");
    }
}
