//! End-to-end tests for loading configuration files.
//!
//! Uses the fixture tree under `tests/fixtures`, which imports across the
//! XML, YAML and INI formats.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use servicewire_loader::loader::{parse_document, read_file};
use servicewire_loader::xml::{PermissiveSchema, ServicesSchema};
use servicewire_loader::{
    Collection, Configuration, Configurator, Definition, Loader, LoaderError, MethodCall,
    Reference, TagExtension, Value,
};

const PROJECT_NAMESPACE: &str = "http://www.example.com/schema/project";

fn fixtures(dir: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(dir)
}

fn xml_loader() -> Loader {
    Loader::new(fixtures("xml"))
}

/// Extension mirroring a typical project bundle: `<project:bar>` defines one
/// parameter and one service, and records the configuration it was given.
fn project_extension(seen: Arc<Mutex<Vec<Collection>>>) -> TagExtension {
    TagExtension::new("project", PROJECT_NAMESPACE).with_tag("bar", move |config: &Collection| {
        seen.lock().unwrap().push(config.clone());

        let mut configuration = Configuration::new();
        configuration.set_parameter(
            "project.parameter.bar",
            config.get("foo").cloned().unwrap_or_else(|| "foobar".into()),
        );
        configuration.set_definition("project.service.bar", Definition::new("FooClass"));
        Ok(configuration)
    })
}

#[test]
fn test_load_missing_file() {
    let loader = Loader::new(fixtures("ini"));
    let err = loader.load("foo.xml").unwrap_err();
    assert!(matches!(err, LoaderError::FileNotFound { .. }));
}

#[test]
fn test_parse_ini_as_xml() {
    let path = fixtures("ini").join("parameters.ini");
    let content = read_file(&path).unwrap();

    let err = parse_document(&path, &content, &ServicesSchema).unwrap_err();
    assert!(matches!(err, LoaderError::XmlParse { .. }));
}

#[test]
fn test_parse_valid_document() {
    let path = fixtures("xml").join("services1.xml");
    let content = read_file(&path).unwrap();

    let document = parse_document(&path, &content, &ServicesSchema).unwrap();
    assert_eq!(document.root_element().tag_name().name(), "container");
}

#[test]
fn test_load_nonvalid_xml() {
    let err = xml_loader().load("nonvalid.xml").unwrap_err();
    assert!(matches!(err, LoaderError::SchemaViolation { .. }));
    assert!(err.to_string().contains("root element must be <container>"));
}

#[test]
fn test_load_empty_container() {
    let configuration = xml_loader().load("services1.xml").unwrap();
    assert!(configuration.is_empty());
    assert_eq!(configuration.resources().len(), 1);
}

#[test]
fn test_load_parameters() {
    let configuration = xml_loader().load("services2.xml").unwrap();

    let mut expected_values = Collection::new();
    expected_values.push(0);
    expected_values.insert("integer", 4);
    expected_values.insert(100, Value::Null);
    expected_values.push("true");
    expected_values.push(true);
    expected_values.push(false);
    expected_values.push("on");
    expected_values.push("off");
    expected_values.insert("float", 1.3);
    expected_values.push(1000.3);
    expected_values.push("a string");
    expected_values.push(Value::list(["foo", "bar"]));

    let mut expected = Collection::new();
    expected.push("a string");
    expected.insert("foo", "bar");
    expected.insert("values", expected_values);
    expected.insert("foo_bar", Reference::new("foo_bar"));

    assert_eq!(configuration.parameters(), &expected);
}

#[test]
fn test_load_parameters_auto_indexes() {
    let configuration = xml_loader().load("services2.xml").unwrap();
    let values = configuration.parameter("values").unwrap().as_collection().unwrap();

    assert_eq!(values.get(101), Some(&Value::from("true")));
    assert_eq!(values.get(106), Some(&Value::Float(1000.3)));
    assert_eq!(values.next_index(), Some(109));
}

#[test]
fn test_load_parameters_after_max_index() {
    let err = xml_loader().load("index_overflow.xml").unwrap_err();
    assert!(matches!(
        err,
        LoaderError::IndexOverflow { ref tag, .. } if tag == "parameter"
    ));
}

#[test]
fn test_load_imports() {
    let configuration = xml_loader().load("services4.xml").unwrap();

    let mut expected = Collection::new();
    expected.push("a string");
    expected.insert("foo", "bar");
    expected.insert("values", Value::list([true, false]));
    expected.insert("foo_bar", Reference::new("foo_bar"));
    expected.insert("bar", "%foo%");
    expected.insert("imported_from_ini", true);
    expected.insert("imported_from_yaml", true);

    assert_eq!(configuration.parameters(), &expected);
    assert_eq!(configuration.resources().len(), 5);
}

#[test]
fn test_load_anonymous_services() {
    let configuration = xml_loader().load("services5.xml").unwrap();
    let services = configuration.definitions();
    assert_eq!(services.len(), 3);

    let args = services["foo"].arguments();
    assert_eq!(args.len(), 1);
    let outer_id = args.get(0).and_then(Value::as_reference).unwrap().id();
    let outer = &services[outer_id];
    assert_eq!(outer.class(), "BarClass");

    let args = outer.arguments();
    assert_eq!(args.len(), 1);
    let inner_id = args.get(0).and_then(Value::as_reference).unwrap().id();
    assert_eq!(services[inner_id].class(), "BazClass");

    // inner definitions are inserted before the services referencing them
    let order: Vec<&str> = services.keys().map(String::as_str).collect();
    assert_eq!(order, vec![inner_id, outer_id, "foo"]);
}

#[test]
fn test_anonymous_ids_are_deterministic() {
    let first = xml_loader().load("services5.xml").unwrap();
    let second = xml_loader().load("services5.xml").unwrap();

    let first_ids: Vec<&String> = first.definitions().keys().collect();
    let second_ids: Vec<&String> = second.definitions().keys().collect();
    assert_eq!(first_ids, second_ids);
    assert!(first_ids[0].starts_with('_'));
}

#[test]
fn test_load_services() {
    let configuration = xml_loader().load("services6.xml").unwrap();
    let services = configuration.definitions();

    assert_eq!(services["foo"].class(), "FooClass");
    assert!(services["shared"].is_shared());
    assert!(!services["non_shared"].is_shared());
    assert_eq!(services["constructor"].constructor(), Some("getInstance"));
    assert_eq!(services["file"].file(), Some("%path%/foo.php"));

    let arguments: Collection = [
        Value::from("foo"),
        Value::reference("foo"),
        Value::list([true, false]),
    ]
    .into_iter()
    .collect();
    assert_eq!(services["arguments"].arguments(), &arguments);

    assert_eq!(
        services["configurator1"].configurator(),
        Some(&Configurator::Function("sc_configure".to_string()))
    );
    assert_eq!(
        services["configurator2"].configurator(),
        Some(&Configurator::Service(
            Reference::new("baz"),
            "configure".to_string()
        ))
    );
    assert_eq!(
        services["configurator3"].configurator(),
        Some(&Configurator::Static(
            "BazClass".to_string(),
            "configureStatic".to_string()
        ))
    );

    assert_eq!(
        services["method_call1"].method_calls(),
        &[MethodCall::new("setBar", Collection::new())]
    );
    assert_eq!(
        services["method_call2"].method_calls(),
        &[MethodCall::new("setBar", arguments)]
    );

    let listeners = &services["annotated"].annotations()["listener"];
    assert_eq!(listeners[0]["event"], Value::from("kernel.request"));
    assert_eq!(listeners[0]["priority"], Value::Int(10));

    assert_eq!(configuration.aliases()["alias_for_foo"], "foo");
    assert!(!services.contains_key("alias_for_foo"));
    assert_eq!(
        configuration.definition("alias_for_foo").map(Definition::class),
        Some("FooClass")
    );
}

#[test]
fn test_local_declarations_override_imports() {
    let configuration = xml_loader().load("import_alias_target.xml").unwrap();

    assert_eq!(configuration.parameter("foo"), Some(&Value::from("local")));
    assert_eq!(configuration.definition("foo").unwrap().class(), "LocalFooClass");
    assert_eq!(configuration.aliases()["default"], "constructor");
    assert_eq!(configuration.aliases()["alias_for_foo"], "foo");
}

#[test]
fn test_dangling_alias_is_rejected() {
    let err = xml_loader().load("dangling_alias.xml").unwrap_err();
    assert!(matches!(
        err,
        LoaderError::UnknownAliasTarget { ref alias, ref target }
            if alias == "alias_for_missing" && target == "missing"
    ));
}

#[test]
fn test_extensions() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let loader = Loader::builder()
        .path(fixtures("xml"))
        .extension(project_extension(Arc::clone(&seen)))
        .build();

    let configuration = loader.load("services10.xml").unwrap();
    assert!(configuration.definitions().contains_key("project.service.bar"));
    assert!(configuration.has_parameter("project.parameter.bar"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get("babar"), Some(&Value::from("babar")));
    assert_eq!(seen[0].get("another"), Some(&Value::Null));
    assert_eq!(
        seen[0].get("another2"),
        Some(&Value::from("%project.parameter.foo%"))
    );
}

#[test]
fn test_invalid_tag() {
    let loader = Loader::builder()
        .path(fixtures("xml"))
        .extension(project_extension(Arc::default()))
        .build();

    let err = loader.load("services11.xml").unwrap_err();
    assert!(matches!(err, LoaderError::InvalidTag { ref tag, .. } if tag == "foobar"));
}

#[test]
fn test_missing_extension() {
    let loader = Loader::builder()
        .path(fixtures("xml"))
        .extension(project_extension(Arc::default()))
        .build();

    let err = loader.load("services12.xml").unwrap_err();
    assert!(matches!(
        err,
        LoaderError::MissingExtension { ref namespace, .. }
            if namespace == "http://www.example.com/schema/foobar"
    ));
}

#[test]
fn test_unknown_extension_tag() {
    let extension = TagExtension::new("project", PROJECT_NAMESPACE);
    let loader = Loader::builder()
        .path(fixtures("xml"))
        .extension(extension)
        .build();

    let err = loader.load("services10.xml").unwrap_err();
    assert!(matches!(err, LoaderError::UnknownExtensionTag { ref tag, .. } if tag == "bar"));
}

#[test]
fn test_circular_import() {
    let loader = Loader::new(fixtures("circular"));
    let err = loader.load("a.xml").unwrap_err();

    let LoaderError::CircularImport { chain } = err else {
        panic!("expected a circular import error, got {err}");
    };
    assert!(chain.contains("a.xml -> "));
    assert!(chain.contains("a.yml -> "));
    assert!(chain.ends_with("a.xml"));
}

#[test]
fn test_load_yaml_with_ini_import() {
    let loader = Loader::new(fixtures("yaml"));
    let configuration = loader.load("services.yml").unwrap();

    assert_eq!(configuration.parameter("foo"), Some(&Value::from("bar")));
    assert_eq!(
        configuration.parameter("mailer.class"),
        Some(&Value::from("Mailer"))
    );

    let mailer = configuration.definition("default_mailer").unwrap();
    assert_eq!(mailer.class(), "%mailer.class%");
    assert_eq!(mailer.arguments().get(0), Some(&Value::reference("transport")));
    assert_eq!(mailer.method_calls()[0].method, "setDebug");

    assert!(!configuration.definition("transport").unwrap().is_shared());
}

#[test]
fn test_nonvalid_ini() {
    let loader = Loader::new(fixtures("ini"));
    let err = loader.load("nonvalid.ini").unwrap_err();
    assert!(matches!(err, LoaderError::IniSyntax { line: 2, .. }));
}

#[test]
fn test_permissive_schema_still_reports_invalid_tag() {
    let loader = Loader::builder()
        .path(fixtures("xml"))
        .validator(PermissiveSchema)
        .build();

    let err = loader.load("services11.xml").unwrap_err();
    assert!(matches!(err, LoaderError::InvalidTag { .. }));
}
