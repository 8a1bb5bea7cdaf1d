use super::*;
use crate::config::RawFlags;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ENTRY: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <!--startcss-->
  <link rel="stylesheet" href="css/a.css">
  <!--endcss-->
  <!--startsrc-->
  <script src="js/a.js"></script>
  <script src="js/b.js"></script>
  <!--endsrc-->
</head>
<body ng-app="app">
  <ion-nav-view></ion-nav-view>
</body>
</html>
"#;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        project.write("index.html", ENTRY);
        project.write("js/a.js", "window.first = function (x) {\n  return x + 1;\n};\n");
        project.write("js/b.js", "window.second = function (y) {\n  return y * 2;\n};\n");
        project.write("css/a.css", ".title {\n  color: #ff0000;\n}\n");
        project.write("templates/home.html", "<div class=\"home\">\n  <h1>{{ title }}</h1>\n</div>\n");
        project.write("img/logo.png", "png");
        project
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn src(&self) -> PathBuf {
        self.root().join("src")
    }

    fn www(&self) -> PathBuf {
        self.root().join("www")
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.src().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config(&self, flags: RawFlags) -> BuildConfig {
        BuildConfig::new(self.root(), &self.root().join(".ionpack"), &flags)
    }

    fn read_www(&self, name: &str) -> String {
        fs::read_to_string(self.www().join(name)).unwrap()
    }
}

fn production() -> RawFlags {
    RawFlags {
        production: Some(true),
        ..RawFlags::default()
    }
}

/// Entry document with the cache-busting value blanked.
fn without_version(markup: &str) -> String {
    let version = regex::Regex::new(r"\?v=\d+").unwrap();
    version.replace_all(markup, "?v=").into_owned()
}

#[tokio::test]
async fn test_production_build() {
    let project = Project::new();
    let summary = build_project(project.config(production()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.scripts, 2);
    assert_eq!(summary.stylesheets, 1);
    assert_eq!(summary.templates, 1);
    assert_eq!(summary.resources, 1);

    let index = project.read_www("index.html");
    assert_eq!(index.matches("<script").count(), 1);
    assert_eq!(index.matches("<link").count(), 1);
    assert!(index.contains("all.min.js?v="));
    assert!(index.contains("all.min.css?v="));
    assert!(index.contains("ng-strict-di"));

    let script = project.read_www("all.min.js");
    assert_eq!(script.matches("(function () {").count(), 3);
    let first = script.find("window.first").unwrap();
    let second = script.find("window.second").unwrap();
    let registry = script.find("window.__templateCache").unwrap();
    assert!(first < second && second < registry);
    assert!(script.contains("templates/home.html"));

    let style = project.read_www("all.min.css");
    assert_eq!(style, ".title{color:red}");

    assert_eq!(fs::read(project.www().join("img/logo.png")).unwrap(), b"png");
    assert!(!project.www().join("js/a.js").exists());
    assert!(!project.root().join("tmp").exists());
}

#[tokio::test]
async fn test_development_build_is_unminified() {
    let project = Project::new();
    build_project(project.config(RawFlags::default()))
        .await
        .unwrap()
        .unwrap();

    let script = project.read_www("all.min.js");
    assert!(script.contains("window.first = function (x) {\n  return x + 1;\n};"));
    assert_eq!(project.read_www("all.min.css"), ".title {\n  color: #ff0000;\n}\n");

    let index = project.read_www("index.html");
    assert!(index.contains("<!--startsrc--><script src=\"all.min.js?v="));
    assert!(!index.contains("js/a.js"));
}

#[tokio::test]
async fn test_template_lint_failure_rejects_build() {
    let project = Project::new();
    project.write("templates/broken.html", "<div>\n  <span>unclosed\n</div>\n");
    fs::create_dir_all(project.www()).unwrap();
    fs::write(project.www().join("previous.txt"), "kept").unwrap();

    let err = build_project(project.config(production())).await.unwrap_err();
    let err = err.downcast_ref::<BuildError>().unwrap();
    assert!(matches!(err, BuildError::TemplateLint(names) if names == "templates/broken.html"));

    // nothing published
    assert_eq!(project.read_www("previous.txt"), "kept");
    assert!(!project.www().join("index.html").exists());
}

#[tokio::test]
async fn test_missing_script_still_builds() {
    let project = Project::new();
    fs::remove_file(project.src().join("js/b.js")).unwrap();

    let summary = build_project(project.config(RawFlags::default()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.scripts, 2);

    let script = project.read_www("all.min.js");
    assert!(script.contains("window.first"));
    assert!(!script.contains("window.second"));
    // the two remaining scopes: `a.js` and the registry
    assert_eq!(script.matches("(function () {").count(), 2);
}

#[tokio::test]
async fn test_annotation_failure_names_script_stage() {
    let project = Project::new();
    project.write("js/b.js", "angular.module('app').controller('Main', function ($scope) {\n  if ($scope) {\n");
    fs::create_dir_all(project.www()).unwrap();
    fs::write(project.www().join("previous.txt"), "kept").unwrap();

    let err = build_project(project.config(RawFlags {
        no_fail_lint: Some(true),
        ..RawFlags::default()
    }))
    .await
    .unwrap_err();

    let err = err.downcast_ref::<BuildError>().unwrap();
    let BuildError::Stage(StageFailure::Scripts(reason)) = err else {
        panic!("expected script stage failure, got {err:?}");
    };
    assert!(reason.contains("js/b.js"));
    assert_eq!(project.read_www("previous.txt"), "kept");
}

#[tokio::test]
async fn test_missing_marker_region_rejects() {
    let project = Project::new();
    project.write(
        "index.html",
        "<html><head><!--startcss--><!--endcss--></head><body></body></html>",
    );

    let err = build_project(project.config(RawFlags::default())).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingMarker("startsrc/endsrc"))
    ));
}

#[tokio::test]
async fn test_rebuild_is_stable() {
    let project = Project::new();
    let config = project.config(production());

    build_project(config.clone()).await.unwrap();
    let first = (
        without_version(&project.read_www("index.html")),
        project.read_www("all.min.js"),
        project.read_www("all.min.css"),
    );
    let first_files = collect_all_files(&project.www());

    build_project(config).await.unwrap();
    let second = (
        without_version(&project.read_www("index.html")),
        project.read_www("all.min.js"),
        project.read_www("all.min.css"),
    );

    assert_eq!(first, second);
    assert_eq!(first_files, collect_all_files(&project.www()));
}

#[tokio::test]
async fn test_skipped_while_serving() {
    let project = Project::new();
    let config = project.config(production());
    fs::create_dir_all(config.paths.marker.parent().unwrap()).unwrap();
    fs::write(&config.paths.marker, "").unwrap();

    assert!(build_project(config).await.unwrap().is_none());
    assert!(!project.www().exists());
}

#[test]
fn test_summary_display() {
    let summary = BuildSummary {
        scripts: 2,
        stylesheets: 1,
        templates: 0,
        resources: 5,
    };
    assert_eq!(
        summary.to_string(),
        "2 scripts, 1 stylesheet, 0 templates, 5 resources copied"
    );
}
