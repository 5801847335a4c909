//! Unit tests for the Debian package builder.

use super::*;
use crate::registry::DirectoryRegistry;
use crate::test_utils::{StubExecutor, StubResponse, arg_after, failure_output};
use chrono::TimeZone;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const CONTROL_SKELETON: &str = "\
Source: rerun-foo
Section: unknown
Priority: optional
Maintainer: root <root@unknown>
Build-Depends: debhelper-compat (= 13)
Standards-Version: 4.6.2
Homepage: <insert the upstream URL, if relevant>
#Vcs-Browser: https://salsa.debian.org/debian/rerun-foo

Package: rerun-foo
Architecture: all
Depends: ${misc:Depends}
Description: <insert up to 60 chars description>
 <insert long description, indented with spaces>
";

const COPYRIGHT_SKELETON: &str = "\
Format: https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/
Upstream-Name: rerun-foo
Upstream-Contact: <preferred name and address to reach the upstream project>
Source: <url://example.com>
#
# Please double check copyright with the licensecheck(1) command.

Files:     *
Copyright: <years> <put author's name and email here>
           <years> <likewise for another author>
License:   Apache-2.0
";

fn module() -> ResolvedModule {
    ResolvedModule {
        name: ModuleName::from("foo"),
        description: "Foo things".to_owned(),
        version: "1.2.0".to_owned(),
        requires: Vec::new(),
        externals: Vec::new(),
        dir: Utf8PathBuf::from("/modules/foo"),
    }
}

fn timestamp() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("unambiguous timestamp")
}

#[test]
fn package_name_follows_debian_convention() {
    assert_eq!(
        package_file_name(&ModuleName::from("foo"), "1.2.0", 3),
        "rerun-foo_1.2.0-3_all.deb"
    );
}

#[rstest]
#[case::redhat(OsFamily::RedHat)]
#[case::macos(OsFamily::MacOs)]
#[case::other(OsFamily::Other)]
fn non_debian_hosts_are_rejected(#[case] platform: OsFamily) {
    let err = check_platform(platform).expect_err("wrong platform");
    assert!(matches!(err, ArchiveError::WrongPlatform { format: "deb", .. }));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn control_file_is_rewritten_for_rerun() {
    let control = control_file(CONTROL_SKELETON, &module(), &PackagingConfig::default());

    assert!(control.contains("\nSection: shells\n"));
    assert!(control.contains("\nMaintainer: Rerun Maintainers <rerun-discuss@googlegroups.com>\n"));
    assert!(control.contains("\nHomepage: https://github.com/rerun-modules/foo\n"));
    assert!(control.contains("\nDepends: ${misc:Depends}, rerun\n"));
    assert!(control.contains("\nDescription: Foo things\n Rerun module foo version 1.2.0.\n .\n"));
    assert!(control.contains("Build-Depends: debhelper-compat (= 13)"));
    assert!(control.contains("#Vcs-Browser"));
    assert!(!control.contains("<insert"));
}

#[test]
fn changelog_names_version_and_release() {
    let changelog = changelog(&module(), 2, &PackagingConfig::default(), &timestamp());
    let mut lines = changelog.lines();

    assert_eq!(
        lines.next(),
        Some("rerun-foo (1.2.0-2) unstable; urgency=low")
    );
    assert!(changelog.contains("  * Release 1.2.0-2 of rerun module foo."));
    assert!(changelog.contains(" -- Rerun Maintainers <rerun-discuss@googlegroups.com>  Fri, "));
    assert!(changelog.contains("Mar 2024 12:00:00"));
}

#[test]
fn copyright_is_filled_in_and_stripped() {
    let copyright = copyright_file(
        COPYRIGHT_SKELETON,
        &module(),
        &PackagingConfig::default(),
        2024,
    );

    assert!(copyright.contains("Source: https://github.com/rerun-modules/foo\n"));
    assert!(copyright.contains("Copyright: 2012-2024 Rerun Contributors\n"));
    assert!(copyright.contains("License:   Apache-2.0\n"));
    assert!(!copyright.contains('#'));
    assert!(!copyright.contains("<years>"));
    assert!(!copyright.contains("Upstream-Contact"));
}

#[test]
fn copyright_is_authored_when_skeleton_is_missing() {
    let copyright = copyright_file("", &module(), &PackagingConfig::default(), 2024);
    assert!(copyright.starts_with("Format: "));
    assert!(copyright.contains("Upstream-Name: rerun-foo\n"));
}

#[test]
fn rules_install_into_module_directory() {
    let rules = rules_file(&module(), &PackagingConfig::default());

    assert!(rules.starts_with("#!/usr/bin/make -f\n"));
    assert!(rules.contains("\n%:\n\tdh $@\n"));
    assert!(rules.contains("\tmkdir -p debian/rerun-foo/usr/lib/rerun/modules/foo\n"));
    assert!(rules.contains("\tcp -pR foo/. debian/rerun-foo/usr/lib/rerun/modules/foo/\n"));
}

struct Tree {
    _temp: TempDir,
    root: Utf8PathBuf,
    registry: DirectoryRegistry,
}

#[fixture]
fn tree() -> Tree {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8");
    let module = root.join("modules/foo");
    fs::create_dir_all(module.join("commands/start")).expect("mkdir module");
    fs::write(
        module.join("metadata"),
        "NAME=foo\nDESCRIPTION=\"Foo things\"\nVERSION=1.2.0\n",
    )
    .expect("write metadata");
    fs::create_dir_all(root.join("work")).expect("mkdir work");
    let registry = DirectoryRegistry::new(vec![root.join("modules")]);
    Tree {
        _temp: temp,
        root,
        registry,
    }
}

impl Tree {
    fn context<'a>(&'a self, executor: &'a StubExecutor) -> BuildContext<'a> {
        BuildContext::new(
            executor,
            &self.registry,
            self.root.join("work"),
            self.root.join("templates"),
        )
        .with_platform(OsFamily::Debian)
        .with_timestamp(timestamp())
    }
}

/// Toolchain replies that create what the real tools would.
fn toolchain(debuild: StubResponse) -> Vec<StubResponse> {
    vec![
        StubResponse::ok("tar").with_effect(|inv| {
            fs::write(arg_after(inv, "-czf").unwrap_or_default(), "tgz")
        }),
        StubResponse::ok("tar").with_effect(|inv| {
            let dest = Utf8Path::new(arg_after(inv, "-C").unwrap_or_default());
            fs::create_dir_all(dest.join("foo-1.2.0/foo/commands"))
        }),
        StubResponse::ok("dh_make").with_effect(|inv| {
            let debian = inv.current_dir.clone().unwrap_or_default().join("debian");
            fs::create_dir_all(&debian)?;
            fs::write(debian.join("control"), CONTROL_SKELETON)?;
            fs::write(debian.join("copyright"), COPYRIGHT_SKELETON)?;
            fs::write(debian.join("changelog"), "skeleton")?;
            fs::write(debian.join("manpage.1.ex"), "example")?;
            fs::write(debian.join("README.Debian"), "readme")
        }),
        debuild,
    ]
}

fn successful_debuild() -> StubResponse {
    StubResponse::ok("debuild").with_effect(|inv| {
        let source = inv.current_dir.clone().unwrap_or_default();
        let parent = source.parent().unwrap_or(Utf8Path::new("/"));
        let debian = source.join("debian");
        assert!(!debian.join("manpage.1.ex").exists());
        assert!(!debian.join("README.Debian").exists());
        fs::write(parent.join("rerun-foo_1.2.0-1_all.deb"), "deb")?;
        fs::write(parent.join("rerun-foo_1.2.0-1.dsc"), "dsc")?;
        fs::write(parent.join("rerun-foo_1.2.0.orig.tar.gz"), "orig")
    })
}

#[rstest]
fn build_produces_named_package_in_working_dir(tree: Tree) {
    let executor = StubExecutor::new(toolchain(successful_debuild()));
    let request = BuildRequest::new("deb", ["foo"]).expect("request");

    let packages = build(&tree.context(&executor), &request).expect("deb builds");

    let work = tree.root.join("work");
    assert_eq!(packages, vec![work.join("rerun-foo_1.2.0-1_all.deb")]);
    assert!(work.join("rerun-foo_1.2.0-1.dsc").is_file());
    assert!(work.join("rerun-foo_1.2.0.orig.tar.gz").is_file());
    executor.assert_finished();
}

#[rstest]
fn dh_make_receives_package_name_and_answers(tree: Tree) {
    let executor = StubExecutor::new(toolchain(successful_debuild()));
    let request = BuildRequest::new("deb", ["foo"]).expect("request");

    build(&tree.context(&executor), &request).expect("deb builds");

    let dh_make = &executor.invocations_of("dh_make")[0];
    assert_eq!(arg_after(dh_make, "--packagename"), Some("rerun-foo_1.2.0"));
    assert!(dh_make.has_arg("--indep"));
    assert_eq!(dh_make.stdin.as_deref(), Some(b"\n".as_slice()));
    assert!(
        dh_make
            .env
            .contains(&("DEBEMAIL".to_owned(), "rerun-discuss@googlegroups.com".to_owned()))
    );
    let debuild = &executor.invocations_of("debuild")[0];
    assert_eq!(debuild.args, vec!["-us", "-uc"]);
}

#[rstest]
fn staging_tarball_excludes_vcs(tree: Tree) {
    let executor = StubExecutor::new(toolchain(successful_debuild()));
    let request = BuildRequest::new("deb", ["foo"]).expect("request");

    build(&tree.context(&executor), &request).expect("deb builds");

    let pack = &executor.invocations_of("tar")[0];
    assert!(pack.has_arg("--exclude-vcs"));
    assert_eq!(pack.args.last().map(String::as_str), Some("foo-1.2.0"));
}

#[rstest]
fn release_and_version_override_shape_the_name(tree: Tree) {
    let debuild = StubResponse::ok("debuild").with_effect(|inv| {
        let source = inv.current_dir.clone().unwrap_or_default();
        let changelog = fs::read_to_string(source.join("debian/changelog"))?;
        assert!(changelog.starts_with("rerun-foo (1.2.0-4)"));
        let parent = source.parent().unwrap_or(Utf8Path::new("/"));
        fs::write(parent.join("rerun-foo_1.2.0-4_all.deb"), "deb")
    });
    let executor = StubExecutor::new(toolchain(debuild));
    let request = BuildRequest::new("deb", ["foo"])
        .expect("request")
        .with_release(4);

    let packages = build(&tree.context(&executor), &request).expect("deb builds");
    assert_eq!(
        packages[0].file_name(),
        Some("rerun-foo_1.2.0-4_all.deb")
    );
}

#[rstest]
fn debuild_failure_names_module_and_artefact(tree: Tree) {
    let executor = StubExecutor::new(toolchain(StubResponse::new(
        "debuild",
        failure_output("dpkg-buildpackage: error"),
    )));
    let request = BuildRequest::new("deb", ["foo"]).expect("request");

    let err = build(&tree.context(&executor), &request).expect_err("debuild fails");

    let message = err.to_string();
    assert!(message.contains("rerun-foo_1.2.0-1_all.deb"));
    assert!(message.contains("module foo"));
    assert_eq!(err.exit_code(), 1);
}

#[rstest]
fn missing_metadata_is_fatal(tree: Tree) {
    fs::remove_file(tree.root.join("modules/foo/metadata")).expect("remove metadata");
    let executor = StubExecutor::default();
    let request = BuildRequest::new("deb", ["foo"]).expect("request");

    let err = build(&tree.context(&executor), &request).expect_err("no metadata");
    assert!(matches!(err, ArchiveError::MetadataUnreadable { .. }));
    assert!(executor.invocations().is_empty());
}

#[rstest]
fn wrong_platform_fails_before_any_work(tree: Tree) {
    let executor = StubExecutor::default();
    let ctx = tree.context(&executor).with_platform(OsFamily::RedHat);
    let request = BuildRequest::new("deb", ["ghost"]).expect("request");

    let err = build(&ctx, &request).expect_err("not debian");
    assert!(matches!(err, ArchiveError::WrongPlatform { .. }));
    assert!(executor.invocations().is_empty());
}
