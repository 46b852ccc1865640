//! Manifests and resource definitions
//!
//! A manifest is an ordered, immutable list of resources. Filtering returns a
//! new manifest holding the matching subset in the original order.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::error::ManifestError;
use super::predicate::Predicate;
use super::types::ResourceRef;

/// Extensions read when loading a manifest directory
const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// A single resource definition: its identity plus the full object body
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    reference: ResourceRef,
    body: Value,
}

impl Resource {
    /// Build a resource from a decoded object.
    ///
    /// `index` is the position of the document in its manifest and is only
    /// used for error reporting.
    pub fn from_value(body: Value, index: usize) -> Result<Self, ManifestError> {
        let field = |pointer: &str, field: &'static str| {
            body.pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(ManifestError::MissingField { index, field })
        };

        let api_version = field("/apiVersion", "apiVersion")?;
        let kind = field("/kind", "kind")?;
        let name = field("/metadata/name", "metadata.name")?;
        let namespace = body
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);

        Ok(Self {
            reference: ResourceRef::new(api_version, kind, name, namespace),
            body,
        })
    }

    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    pub fn api_version(&self) -> &str {
        &self.reference.api_version
    }

    pub fn kind(&self) -> &str {
        &self.reference.kind
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.reference.namespace.as_deref()
    }

    /// The full object as it will be sent to the cluster
    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Ordered collection of resources to apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    resources: Vec<Resource>,
}

impl Manifest {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Parse a multi-document YAML (or JSON) string.
    ///
    /// Empty documents are skipped and `kind: List` documents are replaced by
    /// their items.
    pub fn from_yaml_str(input: &str) -> Result<Self, ManifestError> {
        let mut resources = Vec::new();
        push_yaml(&mut resources, input)?;
        Ok(Self { resources })
    }

    /// Load a manifest from a file, or from every manifest file directly
    /// inside a directory in file-name order.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let io_err = |source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut resources = Vec::new();
        if !path.is_dir() {
            read_file(&mut resources, path)?;
            return Ok(Self { resources });
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(path).map_err(io_err)? {
            let file = entry.map_err(io_err)?.path();
            let is_manifest = file
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext));
            if file.is_file() && is_manifest {
                files.push(file);
            }
        }
        files.sort();

        for file in files {
            read_file(&mut resources, &file)?;
        }

        tracing::debug!(path = %path.display(), resources = resources.len(), "loaded manifest directory");
        Ok(Self { resources })
    }

    /// Resources matching `predicate`, in manifest order
    pub fn filter(&self, predicate: &Predicate) -> Manifest {
        self.resources
            .iter()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

impl FromIterator<Resource> for Manifest {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Append the resources of one file. `.json` files hold a single JSON
/// document; anything else is read as multi-document YAML.
fn read_file(resources: &mut Vec<Resource>, file: &Path) -> Result<(), ManifestError> {
    let contents = std::fs::read_to_string(file).map_err(|source| ManifestError::Io {
        path: file.display().to_string(),
        source,
    })?;

    if file.extension().and_then(|ext| ext.to_str()) == Some("json") {
        let value: Value = serde_json::from_str(&contents)?;
        return push_document(resources, value);
    }
    push_yaml(resources, &contents)
}

fn push_yaml(resources: &mut Vec<Resource>, input: &str) -> Result<(), ManifestError> {
    for document in serde_yaml::Deserializer::from_str(input) {
        let value = Value::deserialize(document)?;
        push_document(resources, value)?;
    }
    Ok(())
}

fn push_document(resources: &mut Vec<Resource>, value: Value) -> Result<(), ManifestError> {
    if value.is_null() {
        return Ok(());
    }

    if value.get("kind").and_then(Value::as_str) == Some("List") {
        if let Some(Value::Array(items)) = value.get("items") {
            for item in items {
                push_document(resources, item.clone())?;
            }
        }
        return Ok(());
    }

    let resource = Resource::from_value(value, resources.len())?;
    resources.push(resource);
    Ok(())
}
