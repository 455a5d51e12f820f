//! Text serialisation of layers and prims.

use crate::sdf::{
    self, Dictionary, LayerOffset, ListEdit, PrimMeta, PrimSpec, Property, PropertyKind, Value, Variability,
};

const INDENT: &str = "    ";

/// Serialises a layer to `#usda 1.0` text.
pub fn write_layer(layer: &sdf::Layer) -> String {
    let mut writer = Writer::default();
    writer.layer(layer);
    writer.out
}

/// Serialises a single prim (and everything below it) as a layer body.
pub fn write_prim(prim: &PrimSpec) -> String {
    let mut writer = Writer::default();
    writer.prim(prim, 0);
    writer.out
}

#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn layer(&mut self, layer: &sdf::Layer) {
        let meta = &layer.meta;
        let mut entries = Vec::new();

        if let Some(doc) = &meta.doc {
            entries.push(format!("doc = {}", quote(doc)));
        }
        if let Some(default_prim) = &meta.default_prim {
            entries.push(format!("defaultPrim = {}", quote(default_prim)));
        }
        if let Some(up_axis) = &meta.up_axis {
            entries.push(format!("upAxis = {}", quote(up_axis)));
        }
        let numbers = [
            ("metersPerUnit", meta.meters_per_unit),
            ("startTimeCode", meta.start_time_code),
            ("endTimeCode", meta.end_time_code),
            ("framesPerSecond", meta.frames_per_second),
            ("timeCodesPerSecond", meta.time_codes_per_second),
        ];
        for (name, value) in numbers {
            if let Some(value) = value {
                entries.push(format!("{name} = {value}"));
            }
        }
        if let Some(data) = &meta.custom_layer_data {
            entries.push(format!("customLayerData = {}", dictionary(data, 1)));
        }
        for (name, value) in sorted(&meta.other) {
            entries.push(format!("{name} = {}", untyped_value(value, 1)));
        }
        if !meta.sub_layers.is_empty() {
            let items = meta
                .sub_layers
                .iter()
                .map(|sublayer| format!("{INDENT}{INDENT}@{}@{}", sublayer.asset_path, offset(&sublayer.layer_offset)))
                .collect::<Vec<_>>()
                .join(",\n");
            entries.push(format!("subLayers = [\n{items}\n{INDENT}]"));
        }

        self.line(0, "#usda 1.0");
        if !entries.is_empty() {
            self.line(0, "(");
            for entry in entries {
                self.line(1, &entry);
            }
            self.line(0, ")");
        }

        for prim in layer.prim_specs() {
            self.out.push('\n');
            self.prim(prim, 0);
        }
    }

    fn prim(&mut self, prim: &PrimSpec, depth: usize) {
        let mut header = prim.specifier.to_string();
        if !prim.type_name.is_empty() {
            header.push(' ');
            header.push_str(&prim.type_name);
        }
        header.push_str(&format!(" {}", quote(&prim.name)));

        let meta = prim_meta(&prim.meta, depth + 1);
        if meta.is_empty() {
            self.line(depth, &header);
        } else {
            self.line(depth, &format!("{header} ("));
            for entry in meta {
                self.line(depth + 1, &entry);
            }
            self.line(depth, ")");
        }
        self.body(prim, depth);
    }

    fn body(&mut self, prim: &PrimSpec, depth: usize) {
        self.line(depth, "{");

        for (name, property) in &prim.properties {
            self.property(name, property, depth + 1);
        }

        for (index, child) in prim.children.iter().enumerate() {
            if index > 0 || !prim.properties.is_empty() {
                self.out.push('\n');
            }
            self.prim(child, depth + 1);
        }

        for (set_name, variant_set) in &prim.variant_sets {
            self.line(depth + 1, &format!("variantSet {} = {{", quote(set_name)));
            for (variant_name, variant) in &variant_set.variants {
                let meta = prim_meta(&variant.meta, depth + 3);
                if meta.is_empty() {
                    self.line(depth + 2, &quote(variant_name));
                } else {
                    self.line(depth + 2, &format!("{} (", quote(variant_name)));
                    for entry in meta {
                        self.line(depth + 3, &entry);
                    }
                    self.line(depth + 2, ")");
                }
                self.body(variant, depth + 2);
            }
            self.line(depth + 1, "}");
        }

        self.line(depth, "}");
    }

    fn property(&mut self, name: &str, property: &Property, depth: usize) {
        let metadata = if property.metadata.is_empty() {
            String::new()
        } else {
            let pad = INDENT.repeat(depth);
            let entries = sorted(&property.metadata)
                .into_iter()
                .map(|(key, value)| format!("{pad}{INDENT}{key} = {}", untyped_value(value, depth + 1)))
                .collect::<Vec<_>>()
                .join("\n");
            format!(" (\n{entries}\n{pad})")
        };

        let custom = if property.custom { "custom " } else { "" };

        if property.kind == PropertyKind::Relationship {
            let keyword = property
                .targets
                .as_ref()
                .and_then(|targets| targets.qual.keyword())
                .map(|k| format!("{k} "))
                .unwrap_or_default();
            let targets = property
                .targets
                .as_ref()
                .map(|targets| format!(" = {}", paths(&targets.items)))
                .unwrap_or_default();
            self.line(depth, &format!("{keyword}{custom}rel {name}{targets}{metadata}"));
            return;
        }

        let uniform = if property.variability == Variability::Uniform {
            "uniform "
        } else {
            ""
        };
        let declared = format!("{custom}{uniform}{} {name}", property.type_name);

        match &property.default {
            Some(value) => self.line(
                depth,
                &format!("{declared} = {}{metadata}", typed_value(value, &property.type_name, depth)),
            ),
            None if !metadata.is_empty() || (property.time_samples.is_empty() && property.targets.is_none()) => {
                self.line(depth, &format!("{declared}{metadata}"))
            }
            None => {}
        }

        if !property.time_samples.is_empty() {
            self.line(depth, &format!("{declared}.timeSamples = {{"));
            for (time, value) in &property.time_samples {
                self.line(
                    depth + 1,
                    &format!("{time}: {},", typed_value(value, &property.type_name, depth + 1)),
                );
            }
            self.line(depth, "}");
        }
        if let Some(targets) = &property.targets {
            self.line(depth, &format!("{declared}.connect = {}", paths(&targets.items)));
        }
    }
}

fn prim_meta(meta: &PrimMeta, depth: usize) -> Vec<String> {
    let mut entries = Vec::new();

    if let Some(doc) = &meta.doc {
        entries.push(format!("doc = {}", quote(doc)));
    }
    if let Some(comment) = &meta.comment {
        entries.push(format!("comment = {}", quote(comment)));
    }
    for (name, flag) in [
        ("active", meta.active),
        ("hidden", meta.hidden),
        ("instanceable", meta.instanceable),
    ] {
        if let Some(flag) = flag {
            entries.push(format!("{name} = {flag}"));
        }
    }
    for (name, text) in [
        ("kind", &meta.kind),
        ("displayName", &meta.display_name),
        ("sceneName", &meta.scene_name),
    ] {
        if let Some(text) = text {
            entries.push(format!("{name} = {}", quote(text)));
        }
    }
    if let Some(schemas) = &meta.api_schemas {
        entries.push(list_edit("apiSchemas", schemas, |name| quote(name)));
    }
    for (name, data) in [
        ("assetInfo", &meta.asset_info),
        ("customData", &meta.custom_data),
        ("sdrMetadata", &meta.sdr_metadata),
        ("clips", &meta.clips),
    ] {
        if let Some(data) = data {
            entries.push(format!("{name} = {}", dictionary(data, depth)));
        }
    }

    if let Some(references) = &meta.references {
        entries.push(list_edit("references", references, |reference| {
            arc_target(&reference.asset_path, &reference.prim_path) + &offset(&reference.layer_offset)
        }));
    }
    if let Some(payload) = &meta.payload {
        entries.push(list_edit("payload", payload, |payload| {
            let layer_offset = payload.layer_offset.map(|o| offset(&o)).unwrap_or_default();
            arc_target(&payload.asset_path, &payload.prim_path) + &layer_offset
        }));
    }
    if let Some(inherits) = &meta.inherits {
        entries.push(list_edit("inherits", inherits, |path| format!("<{path}>")));
    }
    if let Some(specializes) = &meta.specializes {
        entries.push(list_edit("specializes", specializes, |path| format!("<{path}>")));
    }
    if let Some(variant_sets) = &meta.variant_sets {
        entries.push(list_edit("variantSets", variant_sets, |name| quote(name)));
    }
    if let Some(variants) = &meta.variants {
        let pad = INDENT.repeat(depth);
        let body = variants
            .iter()
            .map(|(set, variant)| format!("{pad}{INDENT}string {set} = {}", quote(variant)))
            .collect::<Vec<_>>()
            .join("\n");
        entries.push(format!("variants = {{\n{body}\n{pad}}}"));
    }

    for (name, value) in sorted(&meta.other) {
        entries.push(format!("{name} = {}", untyped_value(value, depth)));
    }

    entries
}

fn list_edit<T>(name: &str, list: &ListEdit<T>, item: impl Fn(&T) -> String) -> String {
    let keyword = list.qual.keyword().map(|k| format!("{k} ")).unwrap_or_default();
    let items = if list.items.is_empty() {
        "None".to_owned()
    } else {
        format!("[{}]", list.items.iter().map(item).collect::<Vec<_>>().join(", "))
    };
    format!("{keyword}{name} = {items}")
}

fn arc_target(asset_path: &str, prim_path: &sdf::Path) -> String {
    match (asset_path.is_empty(), prim_path.is_empty()) {
        (true, _) => format!("<{prim_path}>"),
        (false, true) => format!("@{asset_path}@"),
        (false, false) => format!("@{asset_path}@<{prim_path}>"),
    }
}

fn offset(layer_offset: &LayerOffset) -> String {
    if layer_offset.is_identity() {
        String::new()
    } else {
        format!(" (offset = {}; scale = {})", layer_offset.offset, layer_offset.scale)
    }
}

fn paths(items: &[sdf::Path]) -> String {
    match items {
        [] => "None".to_owned(),
        [single] => format!("<{single}>"),
        many => format!(
            "[{}]",
            many.iter().map(|path| format!("<{path}>")).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn sorted(dict: &Dictionary) -> Vec<(&String, &Value)> {
    let mut entries = dict.iter().collect::<Vec<_>>();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn dictionary(dict: &Dictionary, depth: usize) -> String {
    if dict.is_empty() {
        return "{\n}".to_owned();
    }
    let pad = INDENT.repeat(depth);
    let body = sorted(dict)
        .into_iter()
        .map(|(key, value)| {
            let key = if sdf::is_valid_prim_name(key) {
                key.clone()
            } else {
                quote(key)
            };
            format!(
                "{pad}{INDENT}{} {key} = {}",
                value.type_name(),
                typed_value(value, value.type_name(), depth + 1)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{{\n{body}\n{pad}}}")
}

/// Metadata values are read back without a declared type.
fn untyped_value(value: &Value, depth: usize) -> String {
    match value {
        Value::Token(token) if sdf::is_valid_property_name(token) => token.clone(),
        Value::Int(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Double(v) => float(*v),
        Value::DoubleVec(v) if !v.is_empty() => format!("({})", join(v, |x| float(*x))),
        other => typed_value(other, other.type_name(), depth),
    }
}

fn float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn join<T>(items: &[T], format: impl Fn(&T) -> String) -> String {
    items.iter().map(format).collect::<Vec<_>>().join(", ")
}

fn tuples<T: ToString>(items: &[T], width: usize, is_array: bool) -> String {
    let tuple = |chunk: &[T]| format!("({})", join(chunk, |v| v.to_string()));
    if is_array {
        format!("[{}]", join(&items.chunks(width).collect::<Vec<_>>(), |chunk| tuple(*chunk)))
    } else {
        tuple(items)
    }
}

fn matrices(items: &[f64], rows: usize, is_array: bool) -> String {
    let matrix = |chunk: &[f64]| {
        format!(
            "({})",
            join(&chunk.chunks(rows).collect::<Vec<_>>(), |row| tuples(*row, rows, false))
        )
    };
    if is_array {
        format!(
            "[{}]",
            join(&items.chunks(rows * rows).collect::<Vec<_>>(), |chunk| matrix(*chunk))
        )
    } else {
        matrix(items)
    }
}

/// Formats `value` the way a declaration of `type_name` reads it back.
fn typed_value(value: &Value, type_name: &str, depth: usize) -> String {
    let is_array = type_name.ends_with("[]");
    match value {
        Value::Bool(v) => v.to_string(),
        Value::BoolVec(v) => format!("[{}]", join(v, |b| b.to_string())),
        Value::Uchar(v) => v.to_string(),
        Value::UcharVec(v) => format!("[{}]", join(v, |x| x.to_string())),
        Value::Int(v) => v.to_string(),
        Value::IntVec(v) => format!("[{}]", join(v, |x| x.to_string())),
        Value::Uint(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Int64Vec(v) => format!("[{}]", join(v, |x| x.to_string())),
        Value::Uint64(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::FloatVec(v) => format!("[{}]", join(v, |x| x.to_string())),
        Value::Double(v) => v.to_string(),
        Value::DoubleVec(v) if type_name.is_empty() || type_name == "double[]" => {
            format!("[{}]", join(v, |x| x.to_string()))
        }
        Value::DoubleVec(v) => tuples(v, v.len().max(1), false),
        Value::Vec2i(v) => tuples(v, 2, is_array),
        Value::Vec3i(v) => tuples(v, 3, is_array),
        Value::Vec4i(v) => tuples(v, 4, is_array),
        Value::Vec2f(v) => tuples(v, 2, is_array),
        Value::Vec3f(v) => tuples(v, 3, is_array),
        Value::Vec4f(v) | Value::Quatf(v) => tuples(v, 4, is_array),
        Value::Vec2d(v) => tuples(v, 2, is_array),
        Value::Vec3d(v) => tuples(v, 3, is_array),
        Value::Vec4d(v) | Value::Quatd(v) => tuples(v, 4, is_array),
        Value::Matrix2d(v) => matrices(v, 2, is_array),
        Value::Matrix3d(v) => matrices(v, 3, is_array),
        Value::Matrix4d(v) => matrices(v, 4, is_array),
        Value::String(v) | Value::Token(v) => quote(v),
        Value::StringVec(v) | Value::TokenVec(v) => format!("[{}]", join(v, |s| quote(s))),
        Value::AssetPath(v) => format!("@{v}@"),
        Value::AssetPathVec(v) => format!("[{}]", join(v, |s| format!("@{s}@"))),
        Value::Dictionary(dict) => dictionary(dict, depth),
    }
}
