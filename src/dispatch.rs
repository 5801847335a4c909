//! Format dispatch.
//!
//! Every request runs exactly one builder. Format names are parsed when the
//! [`BuildRequest`] is created, so by the time a request reaches
//! [`dispatch`] the mapping is total.

use crate::context::BuildContext;
use crate::error::Result;
use crate::request::{BuildRequest, Format};
use crate::{debian, rpm, shell_archive};
use camino::Utf8PathBuf;
use log::info;

/// Run the builder for `request.format` and return the artefacts written.
///
/// # Errors
///
/// Returns request validation errors and the builder's first failure.
pub fn dispatch(ctx: &BuildContext<'_>, request: &BuildRequest) -> Result<Vec<Utf8PathBuf>> {
    request.validate()?;
    info!(
        "building {} archive for {} module(s)",
        request.format,
        request.modules.len()
    );

    match request.format {
        Format::ShellArchive => shell_archive::build(ctx, request).map(|path| vec![path]),
        Format::Debian => debian::build(ctx, request),
        Format::Rpm => rpm::build(ctx, request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;
    use crate::host::HostFramework;
    use crate::module_name::ModuleName;
    use crate::platform::OsFamily;
    use crate::registry::MockModuleRegistry;
    use crate::test_utils::StubExecutor;
    use camino::Utf8Path;
    use mockall::predicate::eq;
    use tempfile::TempDir;

    fn context<'a>(
        executor: &'a StubExecutor,
        registry: &'a MockModuleRegistry,
        work: &Utf8Path,
    ) -> BuildContext<'a> {
        BuildContext::new(executor, registry, work.to_owned(), work.join("templates"))
            .with_platform(OsFamily::Other)
            .with_host(HostFramework::new(Some("1.0.0".to_owned()), None))
    }

    fn run(ctx: &BuildContext<'_>, format: &str, modules: &[&str]) -> Result<Vec<Utf8PathBuf>> {
        let request = BuildRequest::new(format, modules.iter().copied())?;
        dispatch(ctx, &request)
    }

    fn work_dir() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let work = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");
        (temp, work)
    }

    #[test]
    fn unknown_format_fails_without_side_effects() {
        let (_temp, work) = work_dir();
        let executor = StubExecutor::default();
        let mut registry = MockModuleRegistry::new();
        registry.expect_resolve().never();
        let ctx = context(&executor, &registry, &work);

        let err = run(&ctx, "xyz", &["foo"]).expect_err("unsupported");

        assert!(matches!(err, ArchiveError::UnsupportedFormat { ref format } if format == "xyz"));
        assert_ne!(err.exit_code(), 0);
        assert!(executor.invocations().is_empty());
        assert_eq!(
            std::fs::read_dir(&work).expect("read work dir").count(),
            0,
            "no files may be produced"
        );
    }

    #[test]
    fn empty_module_list_is_rejected() {
        let (_temp, work) = work_dir();
        let executor = StubExecutor::default();
        let registry = MockModuleRegistry::new();
        let ctx = context(&executor, &registry, &work);

        let err = run(&ctx, "rpm", &[])
            .expect_err("nothing to build");
        assert!(matches!(err, ArchiveError::NoModules));
    }

    #[test]
    fn deb_request_reaches_debian_builder() {
        let (_temp, work) = work_dir();
        let executor = StubExecutor::default();
        let mut registry = MockModuleRegistry::new();
        registry.expect_resolve().never();
        let ctx = context(&executor, &registry, &work);

        let err = run(&ctx, "deb", &["foo"]).expect_err("not debian");
        assert!(matches!(err, ArchiveError::WrongPlatform { format: "deb", .. }));
    }

    #[test]
    fn rpm_request_reaches_rpm_builder() {
        let (_temp, work) = work_dir();
        let executor = StubExecutor::default();
        let mut registry = MockModuleRegistry::new();
        registry
            .expect_resolve()
            .with(eq(ModuleName::from("ghost")))
            .times(1)
            .returning(|name| {
                Err(ArchiveError::ModuleNotFound {
                    name: name.clone(),
                })
            });
        let ctx = context(&executor, &registry, &work);

        let err = run(&ctx, "rpm", &["ghost"]).expect_err("no module");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn bin_request_reaches_shell_archive_builder() {
        let (_temp, work) = work_dir();
        let executor = StubExecutor::default();
        let mut registry = MockModuleRegistry::new();
        registry.expect_resolve().never();
        let ctx = context(&executor, &registry, &work);

        let err = run(&ctx, "bin", &["a", "b"]).expect_err("no version");
        assert!(matches!(err, ArchiveError::MissingVersion));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn duplicate_modules_are_processed_twice() {
        let (_temp, work) = work_dir();
        let executor = StubExecutor::default();
        let mut registry = MockModuleRegistry::new();
        registry
            .expect_resolve()
            .times(2)
            .returning(|_| Ok(Utf8PathBuf::from("/nonexistent/foo")));
        let ctx = context(&executor, &registry, &work);

        let packages = run(&ctx, "rpm", &["foo", "foo"]).expect("skipped modules");
        assert!(packages.is_empty());
    }
}
