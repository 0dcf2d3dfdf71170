use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use modplace_core::prelude::*;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
    }
    fs::write(path, content).expect("write should succeed in test temp dirs");
}

/// Host whose packages already sit in fixed directories.
///
/// `update` switches the install path to the directory registered for the
/// target version and records whether the old placements were still present.
#[derive(Debug, Default)]
struct FakeHost {
    paths: HashMap<String, PathBuf>,
    next: Option<PathBuf>,
    watch: Option<PathBuf>,
    events: Vec<String>,
}

impl FakeHost {
    fn with_package(mut self, name: &str, dir: PathBuf) -> Self {
        self.paths.insert(name.to_string(), dir);
        self
    }
}

impl PackageHost for FakeHost {
    fn install_path(&self, package: &Package) -> PathBuf {
        self.paths
            .get(&package.name)
            .cloned()
            .unwrap_or_else(|| PathBuf::from("/nonexistent"))
    }

    fn install(&mut self, package: &Package) -> DeployResult<()> {
        self.events.push(format!("install {}", package.name));
        Ok(())
    }

    fn update(&mut self, _initial: &Package, target: &Package) -> DeployResult<()> {
        let old_present = self.watch.as_ref().is_some_and(|p| p.exists());
        self.events
            .push(format!("update {} old_present={}", target.name, old_present));
        if let Some(next) = self.next.take() {
            self.paths.insert(target.name.clone(), next);
        }
        Ok(())
    }

    fn uninstall(&mut self, package: &Package) -> DeployResult<()> {
        self.events.push(format!("uninstall {}", package.name));
        Ok(())
    }
}

fn app_root(tmp: &TempDir) -> PathBuf {
    let root = tmp.path().join("htdocs");
    write_file(&root.join("index.php"), "<?php\n");
    root
}

#[test]
fn modman_copy_install_and_uninstall() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);
    let src = tmp.path().join("vendor/acme/payments");
    write_file(
        &src.join("modman"),
        "# acme payments\n\
         code/Payments   app/code/community/Acme/Payments\n\
         \n\
         etc/Acme_Payments.xml  app/etc/modules/Acme_Payments.xml\n\
         @import ../shared\n",
    );
    write_file(&src.join("code/Payments/etc/config.xml"), "<config/>\n");
    write_file(&src.join("etc/Acme_Payments.xml"), "<modules/>\n");

    let host = FakeHost::default().with_package("acme/payments", src.clone());
    let config = InstallerConfig::new(&root).with_strategy(StrategyKind::Copy);
    let mut installer = Installer::new(config, host).unwrap();
    let package = Package::new("acme/payments");

    let report = installer.install(&package).expect("install should succeed");
    let deployed = report.deployed.expect("deployment should run");
    assert_eq!(deployed.placed.len(), 2);
    assert_eq!(
        fs::read_to_string(root.join("app/code/community/Acme/Payments/etc/config.xml")).unwrap(),
        "<config/>\n"
    );
    let module_file = root.join("app/etc/modules/Acme_Payments.xml");
    assert!(fs::symlink_metadata(&module_file).unwrap().file_type().is_file());

    let report = installer.uninstall(&package).expect("uninstall should succeed");
    assert_eq!(report.cleaned.unwrap().removed.len(), 2);
    assert!(!root.join("app/code/community/Acme/Payments").exists());
    assert!(!module_file.exists());
    assert!(root.join("app/etc/modules").is_dir());
    assert!(root.join("index.php").exists());
    assert_eq!(
        installer.host().events,
        vec!["install acme/payments", "uninstall acme/payments"]
    );
}

#[test]
fn update_cleans_old_version_before_host_step() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);

    let v1 = tmp.path().join("cache/acme-theme-1.0");
    write_file(
        &v1.join("modman"),
        "legacy.css skin/frontend/acme/legacy.css\nmain.css skin/frontend/acme/main.css\n",
    );
    write_file(&v1.join("legacy.css"), "/* legacy */\n");
    write_file(&v1.join("main.css"), "/* 1.0 */\n");

    let v2 = tmp.path().join("cache/acme-theme-2.0");
    write_file(
        &v2.join("modman"),
        "main.css skin/frontend/acme/main.css\nprint.css skin/frontend/acme/print.css\n",
    );
    write_file(&v2.join("main.css"), "/* 2.0 */\n");
    write_file(&v2.join("print.css"), "/* print */\n");

    let mut host = FakeHost::default().with_package("acme/theme", v1);
    host.next = Some(v2);
    host.watch = Some(root.join("skin/frontend/acme/legacy.css"));

    let config = InstallerConfig::new(&root).with_strategy(StrategyKind::Copy);
    let mut installer = Installer::new(config, host).unwrap();
    let package = Package::new("acme/theme");

    installer.install(&package).expect("install should succeed");
    assert!(root.join("skin/frontend/acme/legacy.css").exists());

    let report = installer
        .update(&package, &package)
        .expect("update should succeed");
    assert_eq!(report.cleaned.unwrap().removed.len(), 2);
    assert_eq!(report.deployed.unwrap().placed.len(), 2);

    assert!(!root.join("skin/frontend/acme/legacy.css").exists());
    assert_eq!(
        fs::read_to_string(root.join("skin/frontend/acme/main.css")).unwrap(),
        "/* 2.0 */\n"
    );
    assert!(root.join("skin/frontend/acme/print.css").exists());
    assert_eq!(
        installer.host().events,
        vec![
            "install acme/theme",
            "update acme/theme old_present=false"
        ]
    );
}

#[test]
fn skip_package_deployment_only_runs_host_steps() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);
    let src = tmp.path().join("vendor/acme/payments");
    write_file(&src.join("modman"), "code app/code/community/Acme/Payments\n");
    write_file(&src.join("code/etc/config.xml"), "<config/>\n");

    let host = FakeHost::default().with_package("acme/payments", src);
    let config = InstallerConfig::new(&root).with_skip_package_deployment(true);
    let mut installer = Installer::new(config, host).unwrap();
    let package = Package::new("acme/payments");

    let report = installer.install(&package).expect("install should succeed");
    assert!(report.skipped());
    assert!(!root.join("app").exists());

    let report = installer.uninstall(&package).expect("uninstall should succeed");
    assert!(report.skipped());
    assert_eq!(
        installer.host().events,
        vec!["install acme/payments", "uninstall acme/payments"]
    );
}

#[test]
fn mapping_source_selection_order() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);
    let src = tmp.path().join("vendor/acme/module");
    write_file(&src.join("modman"), "code app/code/local/Acme/Module\n");

    let host = FakeHost::default()
        .with_package("acme/module", src)
        .with_package("acme/empty", tmp.path().join("vendor/acme/empty"));
    fs::create_dir_all(tmp.path().join("vendor/acme/empty")).unwrap();
    let installer = Installer::new(InstallerConfig::new(&root), host).unwrap();

    let inline = PackageExtra {
        map: Some(vec![("code".to_string(), "app/code/local/Acme/Module".to_string())]),
        package_xml: Some("package.xml".to_string()),
    };
    let package = Package::new("acme/module").with_extra(inline);
    assert!(matches!(
        installer.mapping_source(&package).unwrap(),
        MappingSource::Inline(_)
    ));

    let manifest = PackageExtra {
        map: None,
        package_xml: Some("package.xml".to_string()),
    };
    let package = Package::new("acme/module").with_extra(manifest);
    assert_eq!(
        installer.mapping_source(&package).unwrap(),
        MappingSource::Manifest("package.xml".to_string())
    );

    let package = Package::new("acme/module");
    assert_eq!(
        installer.mapping_source(&package).unwrap(),
        MappingSource::MappingFile
    );

    let err = installer
        .mapping_source(&Package::new("acme/empty"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("acme/empty"));
    assert!(err.to_string().contains("no known mapping"));
}

#[test]
fn package_xml_install_places_manifest_entries() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);
    let src = tmp.path().join("vendor/acme/module");
    write_file(
        &src.join("package.xml"),
        r#"<?xml version="1.0"?>
<package>
  <name>Acme_Module</name>
  <contents>
    <target name="magecommunity">
      <dir name="Acme">
        <dir name="Module">
          <file name="etc/config.xml"/>
        </dir>
      </dir>
    </target>
    <target name="mageetc">
      <dir name="modules">
        <file name="Acme_Module.xml"/>
      </dir>
    </target>
  </contents>
</package>
"#,
    );
    write_file(
        &src.join("app/code/community/Acme/Module/etc/config.xml"),
        "<config/>\n",
    );
    write_file(&src.join("app/etc/modules/Acme_Module.xml"), "<modules/>\n");

    let host = FakeHost::default().with_package("acme/module", src);
    let config = InstallerConfig::new(&root).with_strategy(StrategyKind::Link);
    let mut installer = Installer::new(config, host).unwrap();
    let package = Package::new("acme/module").with_extra(PackageExtra {
        map: None,
        package_xml: Some("package.xml".to_string()),
    });

    let report = installer.install(&package).expect("install should succeed");
    let targets: Vec<_> = report
        .deployed
        .unwrap()
        .placed
        .iter()
        .map(|m| m.target().to_string())
        .collect();
    assert_eq!(
        targets,
        vec![
            "app/code/community/Acme/Module/etc/config.xml",
            "app/etc/modules/Acme_Module.xml",
        ]
    );
    assert!(root.join("app/etc/modules/Acme_Module.xml").is_file());
}

#[test]
fn modman_root_dir_overrides_host_install_path() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);
    let modman_root = tmp.path().join(".modman");
    write_file(
        &modman_root.join("Acme_Module/modman"),
        "code app/code/local/Acme/Module\n",
    );
    write_file(&modman_root.join("Acme_Module/code/etc/config.xml"), "<config/>\n");
    fs::create_dir_all(modman_root.join("module")).unwrap();

    let config = InstallerConfig::new(&root)
        .with_strategy(StrategyKind::Copy)
        .with_modman_root_dir(&modman_root);
    let mut installer = Installer::new(config, FakeHost::default()).unwrap();

    let package = Package::new("acme/module");
    assert_eq!(
        installer.source_dir(&package).unwrap(),
        modman_root.join("module")
    );

    let package = package.with_target_dir("Acme_Module");
    installer.install(&package).expect("install should succeed");
    assert!(root.join("app/code/local/Acme/Module/etc/config.xml").is_file());
}

#[test]
fn conflicting_install_reports_package() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);
    let src = tmp.path().join("vendor/acme/module");
    write_file(&src.join("modman"), "index.php index.php\n");
    write_file(&src.join("index.php"), "<?php // acme\n");

    let host = FakeHost::default().with_package("acme/module", src);
    let mut installer = Installer::new(InstallerConfig::new(&root), host).unwrap();

    let err = installer.install(&Package::new("acme/module")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().starts_with("package 'acme/module'"));
    assert_eq!(fs::read_to_string(root.join("index.php")).unwrap(), "<?php\n");
}

#[test]
fn installer_rejects_missing_root() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let config = InstallerConfig::new(tmp.path().join("missing"));
    let err = Installer::new(config, FakeHost::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn relative_install_path_names_package_once() {
    let tmp = TempDir::new().expect("tempdir should succeed");
    let root = app_root(&tmp);
    let host = FakeHost::default().with_package("acme/module", PathBuf::from("relative/dir"));
    let installer = Installer::new(InstallerConfig::new(&root), host).unwrap();

    let err = installer
        .source_dir(&Package::new("acme/module"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let message = err.to_string();
    assert_eq!(message.matches("acme/module").count(), 1, "{}", message);
    assert!(message.starts_with("package 'acme/module': configuration error: source directory"));
}
