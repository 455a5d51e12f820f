use anyhow::{bail, ensure, Result};
use std::fmt;

/// Scene description path, such as `/World/Geom` or `/World/Geom.points`.
///
/// The prim part is a `/` separated list of element names. The optional
/// property part follows the first `.` of the last element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    prim: String,
    prop: String,
}

impl Path {
    /// Parses and validates a path string.
    pub fn new(path: &str) -> Result<Self> {
        let path = path.trim();
        ensure!(!path.is_empty(), "Path must not be empty");

        let last_element = path.rfind('/').map_or(0, |index| index + 1);
        let (prim, prop) = match path[last_element..].find('.') {
            // `..` elements are parent references, not property separators.
            Some(dot) if !path[last_element..].starts_with("..") => {
                let split = last_element + dot;
                (&path[..split], &path[split + 1..])
            }
            _ => (path, ""),
        };

        if prim != "/" {
            let elements = prim.strip_prefix('/').unwrap_or(prim);
            for element in elements.split('/') {
                ensure!(
                    element == ".." || is_valid_prim_name(element),
                    "Invalid path element '{element}' in path '{path}'"
                );
            }
        }
        if !prop.is_empty() {
            ensure!(
                is_valid_property_name(prop),
                "Invalid property name '{prop}' in path '{path}'"
            );
        } else if path.ends_with('.') {
            bail!("Path '{path}' has an empty property name");
        }

        Ok(Self {
            prim: prim.to_owned(),
            prop: prop.to_owned(),
        })
    }

    /// The absolute root path `/`.
    pub fn abs_root() -> Self {
        Self {
            prim: "/".to_owned(),
            prop: String::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prim.is_empty() && self.prop.is_empty()
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.prim.starts_with('/')
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.prim == "/" && self.prop.is_empty()
    }

    #[inline]
    pub fn is_prim_path(&self) -> bool {
        !self.prim.is_empty() && self.prop.is_empty()
    }

    #[inline]
    pub fn is_property_path(&self) -> bool {
        !self.prop.is_empty()
    }

    pub fn prim_part(&self) -> &str {
        &self.prim
    }

    pub fn prop_part(&self) -> &str {
        &self.prop
    }

    /// Returns the prim portion of this path as a new path.
    pub fn prim_path(&self) -> Self {
        Self {
            prim: self.prim.clone(),
            prop: String::new(),
        }
    }

    /// Element names of the prim part, root first.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.prim.split('/').filter(|element| !element.is_empty())
    }

    /// Last element name: the property name for property paths, otherwise the prim name.
    pub fn name(&self) -> &str {
        if !self.prop.is_empty() {
            return &self.prop;
        }
        self.element_names().last().unwrap_or_default()
    }

    /// Returns the parent prim path, or `None` for the root and relative single-element paths.
    pub fn parent(&self) -> Option<Self> {
        if self.is_property_path() {
            return Some(self.prim_path());
        }
        let index = self.prim.rfind('/')?;
        let prim = if index == 0 {
            if self.prim.len() == 1 {
                return None;
            }
            "/".to_owned()
        } else {
            self.prim[..index].to_owned()
        };
        Some(Self {
            prim,
            prop: String::new(),
        })
    }

    /// Appends a prim element name.
    pub fn append_child(&self, name: &str) -> Result<Self> {
        ensure!(
            !self.is_property_path(),
            "Cannot append child '{name}' to property path '{self}'"
        );
        ensure!(is_valid_prim_name(name), "Invalid prim name '{name}'");

        let prim = if self.prim.is_empty() {
            name.to_owned()
        } else if self.prim.ends_with('/') {
            format!("{}{name}", self.prim)
        } else {
            format!("{}/{name}", self.prim)
        };

        Ok(Self {
            prim,
            prop: String::new(),
        })
    }

    /// Appends a property name to a prim path.
    pub fn append_property(&self, name: &str) -> Result<Self> {
        ensure!(
            !self.is_property_path(),
            "Cannot append property '{name}' to property path '{self}'"
        );
        ensure!(!self.is_root(), "Cannot append property '{name}' to the root path");
        ensure!(is_valid_property_name(name), "Invalid property name '{name}'");

        Ok(Self {
            prim: self.prim.clone(),
            prop: name.to_owned(),
        })
    }

    /// Returns `true` if `self` equals `prefix` or lives below it.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        if prefix.is_root() {
            return self.is_absolute();
        }
        match self.prim.strip_prefix(prefix.prim.as_str()) {
            Some("") => prefix.prop.is_empty() || self.prop == prefix.prop,
            Some(rest) => prefix.prop.is_empty() && rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prop.is_empty() {
            write!(f, "{}", self.prim)
        } else {
            write!(f, "{}.{}", self.prim, self.prop)
        }
    }
}

impl TryFrom<&str> for Path {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        Path::new(value)
    }
}

/// Shorthand for [Path::new].
#[inline]
pub fn path(path: &str) -> Result<Path> {
    Path::new(path)
}

/// Prim names are identifiers: a letter or `_` followed by letters, digits or `_`.
pub fn is_valid_prim_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Property names are namespaced identifiers such as `inputs:diffuseColor`.
pub fn is_valid_property_name(name: &str) -> bool {
    !name.is_empty() && name.split(':').all(is_valid_prim_name)
}
