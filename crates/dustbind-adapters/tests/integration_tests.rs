//! End-to-end tests: a site on disk, the local filesystem, TOML manifests,
//! and the adapter driving the engine.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::json;
use tempfile::TempDir;

use dustbind_adapters::{JsonConfig, LocalFilesystem, MemoryFilesystem, TomlExtensionLoader};
use dustbind_core::{
    application::{ApplicationError, ports::Filesystem},
    error::DustError,
    prelude::*,
};

const PRODUCTS: &str =
    "{>\"partials/header\"/}<ul>{#products}<li>{name} - {price}</li>{/products}</ul>{>\"partials/footer\"/}";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "pages/partials/header.dust", "<header>{title|up}</header>");
    write(
        root,
        "pages/partials/footer.dust",
        "<footer>{@Trim}  {year}  {/Trim}</footer>",
    );
    write(
        root,
        "workspace/utils/filters/text.toml",
        "[[filter]]\nname = \"up\"\napply = [\"upper\"]\n\n[[filter]]\nname = \"trim\"\napply = [\"trim\"]\n",
    );
    write(
        root,
        "workspace/utils/helpers/layout/trim.toml",
        "[[helper]]\nname = \"Trim\"\ntemplate = \"{body|trim|s}\"\n",
    );
    write(root, "workspace/utils/helpers/README.md", "not a manifest");
    dir
}

fn options(root: &Path) -> AdapterOptions {
    AdapterOptions::new(root.join("pages"))
        .with_partials([
            root.join("pages/partials/header.dust"),
            root.join("pages/partials/footer.dust"),
        ])
        .with_working_dir(root)
}

fn adapter(root: &Path, config: JsonConfig) -> DustAdapter {
    DustAdapter::new(
        Arc::new(config),
        Arc::new(LocalFilesystem::new()),
        Arc::new(TomlExtensionLoader::new()),
        options(root),
    )
}

fn client_render(settings: serde_json::Value) -> JsonConfig {
    JsonConfig::new(json!({ "engines": { "dust": { "clientRender": settings } } }))
}

fn relative(root: &Path, mut written: Vec<PathBuf>) -> Vec<String> {
    written.sort();
    written
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[tokio::test]
async fn initialise_loads_extensions_and_partials() {
    let dir = site();
    let adapter = adapter(dir.path(), JsonConfig::default());

    adapter.initialise().await.unwrap();

    assert_eq!(adapter.state(), AdapterState::Ready);
    let core = adapter.core();
    assert!(core.has_filter("up"));
    assert!(core.has_helper("Trim"));
    assert_eq!(
        core.template_names(),
        vec!["partials/footer", "partials/header"]
    );
}

#[tokio::test]
async fn page_renders_with_partials_filters_and_helpers() {
    let dir = site();
    let adapter = adapter(dir.path(), JsonConfig::default());
    adapter.initialise().await.unwrap();
    adapter.register("products", PRODUCTS).unwrap();

    let html = adapter
        .render(
            "products",
            Some(PRODUCTS),
            &json!({
                "title": "shop",
                "year": 2024,
                "products": [{ "name": "A", "price": 1 }, { "name": "B", "price": 2 }]
            }),
            &RenderOptions::default(),
        )
        .unwrap();

    assert_eq!(
        html,
        "<header>SHOP</header><ul><li>A - 1</li><li>B - 2</li></ul><footer>2024</footer>"
    );
}

#[tokio::test]
async fn unresolved_helper_leaves_siblings_intact() {
    let dir = site();
    let adapter = adapter(dir.path(), JsonConfig::default());
    adapter.initialise().await.unwrap();
    adapter
        .register(
            "page",
            "{>\"partials/header\"/}<a>{@missing}X{/missing}<b>",
        )
        .unwrap();

    let html = adapter
        .render("page", None, &json!({ "title": "t" }), &RenderOptions::default())
        .unwrap();
    assert_eq!(html, "<header>T</header><a><b>");
}

#[tokio::test]
async fn missing_extension_directories_are_tolerated() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pages/partials/header.dust", "h");
    write(dir.path(), "pages/partials/footer.dust", "f");

    let adapter = adapter(dir.path(), JsonConfig::default());
    adapter.initialise().await.unwrap();
    assert_eq!(adapter.state(), AdapterState::Ready);
}

#[tokio::test]
async fn bad_manifest_fails_initialise() {
    let dir = site();
    write(
        dir.path(),
        "workspace/utils/filters/broken.toml",
        "[[filter]]\nname = \"odd\"\napply = [\"reverse\"]\n",
    );
    let adapter = adapter(dir.path(), JsonConfig::default());

    let err = adapter.initialise().await.unwrap_err();
    assert!(matches!(
        err,
        DustError::Application(ApplicationError::Extension { .. })
    ));
    assert_eq!(adapter.state(), AdapterState::Constructed);
    // Partials were never reached.
    assert!(adapter.core().template_names().is_empty());
}

#[tokio::test]
async fn separate_export_writes_one_file_per_template() {
    let dir = TempDir::new().unwrap();
    let config = client_render(json!({ "enabled": true, "format": "separate", "path": "out" }));
    let adapter = DustAdapter::new(
        Arc::new(config),
        Arc::new(LocalFilesystem::new()),
        Arc::new(TomlExtensionLoader::new()),
        AdapterOptions::new(dir.path().join("pages")).with_working_dir(dir.path()),
    );
    adapter.initialise().await.unwrap();
    adapter.register("a", "A").unwrap();
    adapter.register("b/c", "C {x}").unwrap();

    let written = adapter.finish_loading().await.unwrap();

    assert_eq!(relative(dir.path(), written), vec!["out/a.js", "out/b/c.js"]);
    let nested = std::fs::read_to_string(dir.path().join("out/b/c.js")).unwrap();
    assert!(nested.starts_with("(function(dust){dust.register(\"b/c\",body_0);"));
    assert_eq!(
        nested,
        adapter.core().template("b/c").unwrap().client_source(true)
    );
}

#[tokio::test]
async fn combined_export_concatenates_templates() {
    let dir = TempDir::new().unwrap();
    let config = client_render(json!({
        "enabled": true,
        "format": "combined",
        "path": "bundle/templates.js"
    }));
    let adapter = DustAdapter::new(
        Arc::new(config),
        Arc::new(LocalFilesystem::new()),
        Arc::new(TomlExtensionLoader::new()),
        AdapterOptions::new(dir.path().join("pages")).with_working_dir(dir.path()),
    );
    adapter.initialise().await.unwrap();
    adapter.register("one", "1").unwrap();
    adapter.register("two", "2").unwrap();

    let written = adapter.export_client_templates().await.unwrap();
    assert_eq!(relative(dir.path(), written), vec!["bundle/templates.js"]);

    let expected: String = adapter
        .core()
        .templates()
        .iter()
        .map(|t| t.client_source(true))
        .collect();
    let bundle = std::fs::read_to_string(dir.path().join("bundle/templates.js")).unwrap();
    assert_eq!(bundle, expected);
}

#[tokio::test]
async fn whitelist_limits_exported_templates() {
    let dir = site();
    let config = client_render(json!({
        "enabled": true,
        "path": "public/js",
        "whitelist": ["partials/*"]
    }));
    let adapter = adapter(dir.path(), config);
    adapter.initialise().await.unwrap();
    adapter.register("products", PRODUCTS).unwrap();

    let written = adapter.finish_loading().await.unwrap();
    assert_eq!(
        relative(dir.path(), written),
        vec!["public/js/partials/footer.js", "public/js/partials/header.js"]
    );
    assert!(!dir.path().join("public/js/products.js").exists());
}

#[tokio::test]
async fn public_path_prefixes_output() {
    let dir = TempDir::new().unwrap();
    let config = client_render(json!({ "enabled": true }));
    config.set("paths.public", json!("static"));
    let adapter = DustAdapter::new(
        Arc::new(config),
        Arc::new(LocalFilesystem::new()),
        Arc::new(TomlExtensionLoader::new()),
        AdapterOptions::new(dir.path().join("pages")).with_working_dir(dir.path()),
    );
    adapter.initialise().await.unwrap();
    adapter.register("home", "hi").unwrap();

    let written = adapter.finish_loading().await.unwrap();
    assert_eq!(relative(dir.path(), written), vec!["static/templates/home.js"]);
}

#[tokio::test]
async fn disabled_export_performs_no_writes() {
    let fs = MemoryFilesystem::new()
        .with_file("/site/pages/partials/header.dust", "<h>{title}</h>")
        .with_file("/site/pages/partials/footer.dust", "<f/>");
    let filesystem: Arc<dyn Filesystem> = Arc::new(fs.clone());
    let adapter = DustAdapter::new(
        Arc::new(JsonConfig::default()),
        filesystem,
        Arc::new(TomlExtensionLoader::new()),
        options(Path::new("/site")),
    );
    adapter.initialise().await.unwrap();

    let written = adapter.finish_loading().await.unwrap();
    assert!(written.is_empty());
    assert_eq!(fs.write_count(), 0);
}

#[tokio::test]
async fn whitespace_option_applies_to_one_render() {
    let dir = TempDir::new().unwrap();
    let adapter = DustAdapter::new(
        Arc::new(JsonConfig::new(json!({ "engines": { "dust": { "whitespace": false } } }))),
        Arc::new(LocalFilesystem::new()),
        Arc::new(TomlExtensionLoader::new()),
        AdapterOptions::new(dir.path().join("pages")).with_working_dir(dir.path()),
    );
    adapter.initialise().await.unwrap();
    adapter.register("ws", "<p>\n  {x}\n</p>").unwrap();

    let locals = json!({ "x": 1 });
    let kept = adapter
        .render("ws", None, &locals, &RenderOptions::keep_whitespace(true))
        .unwrap();
    let default = adapter
        .render("ws", None, &locals, &RenderOptions::default())
        .unwrap();

    assert_eq!(kept, "<p>\n  1\n</p>");
    assert_eq!(default, "<p>1</p>");
}
