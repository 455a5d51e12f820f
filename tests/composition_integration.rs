//! Integration tests composing the layer files under `fixtures/`.

use std::fs;
use std::path::{Path, PathBuf};

use usd_compose::composition::{compose_file, extract_variants, Composition, CompositionError, CompositionOptions};
use usd_compose::sdf::{self, Layer, PrimSpec, Specifier, Value, DEFAULT_PREDICATE_DEPTH};
use usd_compose::usda;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

fn prim<'a>(layer: &'a Layer, path: &str) -> &'a PrimSpec {
    layer
        .find_prim_spec(&sdf::path(path).unwrap())
        .unwrap_or_else(|| panic!("{path} not found in {}", layer.identifier))
}

fn assert_fully_composed(composition: &Composition) {
    let layer = &composition.layer;
    assert!(!layer.has_unresolved_references(DEFAULT_PREDICATE_DEPTH));
    assert!(!layer.has_unresolved_payload(DEFAULT_PREDICATE_DEPTH));
    assert!(!layer.has_unresolved_inherits(DEFAULT_PREDICATE_DEPTH));
    assert!(!layer.has_unresolved_variants(DEFAULT_PREDICATE_DEPTH));
    assert!(layer.meta.sub_layers.is_empty());
}

#[test]
fn test_compose_scene() {
    let composition = compose_file(fixture_path("scene/scene.usda"), &CompositionOptions::default())
        .expect("Failed to compose scene");
    assert_fully_composed(&composition);
    assert!(composition.warnings.is_empty(), "{:?}", composition.warnings);
    assert_eq!(composition.layers.len(), 5, "{:?}", composition.layers);

    let layer = &composition.layer;
    assert_eq!(layer.meta.default_prim.as_deref(), Some("World"));
    assert_eq!(
        layer.prim_spec_names().collect::<Vec<_>>(),
        ["_Furniture", "World", "Set", "Lights"]
    );
}

#[test]
fn test_sublayer_strength() {
    let composition = compose_file(fixture_path("scene/scene.usda"), &CompositionOptions::default()).unwrap();
    let layer = &composition.layer;

    // The root's over lands on the def from set.usda.
    let set = prim(layer, "/Set");
    assert_eq!(set.specifier, Specifier::Def);
    assert_eq!(set.type_name, "Xform");
    assert_eq!(set.attribute_value("wallHeight"), Some(&Value::Float(3.0)));
    assert_eq!(set.attribute_value("wallColor"), Some(&Value::String("white".into())));

    // lighting.usda is listed first and wins over set.usda.
    let lights = prim(layer, "/Lights");
    assert!(lights.child("Key").is_some());
    assert!(lights.child("Fill").is_none());
}

#[test]
fn test_reference_and_variant_selection() {
    let composition = compose_file(fixture_path("scene/scene.usda"), &CompositionOptions::default()).unwrap();
    let chair = prim(&composition.layer, "/World/Chair");

    assert_eq!(chair.type_name, "Xform");
    assert_eq!(chair.meta.kind.as_deref(), Some("component"));
    assert_eq!(
        chair.attribute_value("xformOp:translate"),
        Some(&Value::Vec3d(vec![1.0, 0.0, 2.0]))
    );

    // The referencing prim selects `metal` over the referenced `wood`.
    assert_eq!(
        chair.attribute_value("primvars:displayColor"),
        Some(&Value::Vec3f(vec![0.8, 0.8, 0.8]))
    );
    let seat = chair.child("Seat").unwrap();
    assert_eq!(seat.specifier, Specifier::Def);
    assert_eq!(seat.type_name, "Mesh");
    assert_eq!(seat.attribute_value("roughness"), Some(&Value::Float(0.2)));
    assert!(chair.child("SR_Wood").is_none());
}

#[test]
fn test_variant_selection_option_loads_material_x() {
    let options = CompositionOptions::default().with_selection("look", "wood");
    let composition = compose_file(fixture_path("scene/scene.usda"), &options).unwrap();
    assert_fully_composed(&composition);
    assert!(composition.layers.iter().any(|layer| layer.ends_with("wood.mtlx")));

    let chair = prim(&composition.layer, "/World/Chair");
    assert_eq!(chair.type_name, "Xform");
    assert_eq!(
        chair.attribute_value("primvars:displayColor"),
        Some(&Value::Vec3f(vec![0.6, 0.4, 0.2]))
    );

    let shader = chair.child("SR_Wood").unwrap();
    assert_eq!(shader.type_name, "Shader");
    assert_eq!(
        shader.attribute_value("info:id"),
        Some(&Value::Token("ND_standard_surface_surfaceshader".into()))
    );
    let material = chair.child("Wood").unwrap();
    assert_eq!(material.type_name, "Material");
    assert!(chair.child("Seat").is_some());
}

#[test]
fn test_payload_and_inherits() {
    let composition = compose_file(fixture_path("scene/scene.usda"), &CompositionOptions::default()).unwrap();
    let layer = &composition.layer;

    let lamp = prim(layer, "/World/Lamp");
    assert_eq!(lamp.type_name, "Xform");
    assert_eq!(lamp.attribute_value("intensity"), Some(&Value::Float(100.0)));
    assert_eq!(prim(layer, "/World/Lamp/Bulb").type_name, "Sphere");

    let table = prim(layer, "/World/Table");
    assert_eq!(table.specifier, Specifier::Def);
    assert_eq!(table.type_name, "Xform");
    assert_eq!(table.meta.kind.as_deref(), Some("component"));
    assert_eq!(table.attribute_value("furniture"), Some(&Value::Bool(true)));
    assert_eq!(table.attribute_value("material"), Some(&Value::String("walnut".into())));
}

#[test]
fn test_payloads_can_stay_unloaded() {
    let options = CompositionOptions {
        load_payloads: false,
        ..Default::default()
    };
    let composition = compose_file(fixture_path("scene/scene.usda"), &options).unwrap();

    let lamp = prim(&composition.layer, "/World/Lamp");
    assert!(lamp.meta.payload.is_some());
    assert!(lamp.child("Bulb").is_none());
    assert_eq!(composition.warnings.len(), 1);
    assert_eq!(composition.layers.len(), 4);
}

#[test]
fn test_circular_sublayers() {
    let err = compose_file(fixture_path("cycle/a.usda"), &CompositionOptions::default()).unwrap_err();
    assert!(matches!(err, CompositionError::CircularSublayer { .. }), "{err}");
    assert!(err.to_string().contains("a.usda"));
}

#[test]
fn test_unsupported_list_edit() {
    let err = compose_file(fixture_path("unsupported_list_edit.usda"), &CompositionOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "'add' list edit on references of '/World' is not supported yet"
    );
}

#[test]
fn test_missing_assets_relaxed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.usda");
    fs::write(
        &path,
        r#"#usda 1.0
(
    subLayers = [@./missing_layer.usda@]
)

def "World" (
    references = @./missing_prop.usda@
)
{
    int kept = 1
}
"#,
    )
    .unwrap();

    let err = compose_file(&path, &CompositionOptions::default()).unwrap_err();
    assert!(matches!(err, CompositionError::AssetNotFound { .. }));

    let composition = compose_file(&path, &CompositionOptions::relaxed()).unwrap();
    assert_eq!(composition.warnings.len(), 2, "{:?}", composition.warnings);
    let world = prim(&composition.layer, "/World");
    assert_eq!(world.attribute_value("kept"), Some(&Value::Int(1)));
    assert!(world.meta.references.is_none());
}

#[test]
fn test_search_paths() {
    let dir = tempfile::tempdir().unwrap();
    let library = dir.path().join("library");
    let shots = dir.path().join("shots");
    fs::create_dir_all(&library).unwrap();
    fs::create_dir_all(&shots).unwrap();

    fs::write(library.join("rock.usda"), "#usda 1.0\ndef Mesh \"Rock\" { int size = 3 }\n").unwrap();
    fs::write(
        shots.join("shot.usda"),
        "#usda 1.0\ndef \"Rock\" (\n    references = @rock.usda@\n)\n{\n}\n",
    )
    .unwrap();

    let path = shots.join("shot.usda");
    assert!(compose_file(&path, &CompositionOptions::default()).is_err());

    let options = CompositionOptions {
        search_paths: vec![library],
        ..Default::default()
    };
    let composition = compose_file(&path, &options).unwrap();
    let rock = prim(&composition.layer, "/Rock");
    assert_eq!(rock.type_name, "Mesh");
    assert_eq!(rock.attribute_value("size"), Some(&Value::Int(3)));
}

#[test]
fn test_nested_reference_next_to_payload() {
    let dir = tempfile::tempdir().unwrap();
    let props = dir.path().join("props");
    fs::create_dir_all(&props).unwrap();

    fs::write(
        dir.path().join("scene.usda"),
        r#"#usda 1.0

def "World" (
    references = @./props/chair.usda@
    payload = @./heavy.usda@
)
{
}
"#,
    )
    .unwrap();
    fs::write(dir.path().join("heavy.usda"), "#usda 1.0\ndef \"Heavy\" { int detail = 9 }\n").unwrap();
    fs::write(
        props.join("chair.usda"),
        "#usda 1.0\ndef Xform \"Chair\" (\n    references = @./leg.usda@\n)\n{\n    int seat = 1\n}\n",
    )
    .unwrap();
    fs::write(props.join("leg.usda"), "#usda 1.0\ndef Mesh \"Leg\" { int legs = 4 }\n").unwrap();

    let composition = compose_file(dir.path().join("scene.usda"), &CompositionOptions::default()).unwrap();
    assert_fully_composed(&composition);
    assert_eq!(composition.layers.len(), 4, "{:?}", composition.layers);

    let world = prim(&composition.layer, "/World");
    assert_eq!(world.type_name, "Xform");
    assert_eq!(world.attribute_value("seat"), Some(&Value::Int(1)));
    assert_eq!(world.attribute_value("legs"), Some(&Value::Int(4)));
    assert_eq!(world.attribute_value("detail"), Some(&Value::Int(9)));
}

#[test]
fn test_flattened_output_reads_back() {
    let composition = compose_file(fixture_path("scene/scene.usda"), &CompositionOptions::default()).unwrap();
    let text = usda::write_layer(&composition.layer);
    let reread = usda::read_layer(text.as_bytes(), "flattened.usda").unwrap();

    assert_eq!(
        reread.prim_spec_names().collect::<Vec<_>>(),
        composition.layer.prim_spec_names().collect::<Vec<_>>()
    );
    let chair = prim(&reread, "/World/Chair");
    assert_eq!(chair.type_name, "Xform");
    assert!(chair.child("Seat").is_some());
    assert!(!reread.has_unresolved_references(DEFAULT_PREDICATE_DEPTH));
}

#[test]
fn test_extract_variants_before_composition() {
    let layer = usda::TextReader::read(fixture_path("scene/props/chair.usda")).unwrap();
    let variants = extract_variants(&layer).unwrap();

    let info = &variants["/Chair"];
    assert_eq!(info.variant_sets, ["look"]);
    assert_eq!(info.selections["look"], "wood");
    assert_eq!(info.variants["look"], ["metal", "wood"]);
}

#[test]
fn test_composition_is_deterministic() {
    let path: &Path = &fixture_path("scene/scene.usda");
    let first = compose_file(path, &CompositionOptions::default()).unwrap();
    let second = compose_file(path, &CompositionOptions::default()).unwrap();
    assert_eq!(first, second);
}
