use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ModelError;
use crate::types::{self, TypeCatalog, TypeRef};
use crate::value::Value;

use super::{
    ComponentKind, ComponentModel, ExpressionSupport, MetadataType, ObjectField, ObjectType,
    ParameterModel,
};

/// Component model file as written in YAML.
#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default)]
    types: Vec<TypeDefinition>,
    #[serde(default)]
    component: Option<ComponentDefinition>,
    #[serde(default)]
    components: Vec<ComponentDefinition>,
}

#[derive(Debug, Deserialize)]
struct TypeDefinition {
    name: String,
    #[serde(default)]
    fields: Vec<FieldDefinition>,
}

#[derive(Debug, Deserialize)]
struct FieldDefinition {
    name: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(rename = "type")]
    type_expression: String,
    #[serde(default)]
    default: Option<serde_yaml::Value>,
    #[serde(default)]
    expression_support: Option<ExpressionSupport>,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct ComponentDefinition {
    name: String,
    kind: ComponentKind,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Deserialize)]
struct ParameterDefinition {
    name: String,
    #[serde(rename = "type")]
    type_expression: String,
    #[serde(default)]
    member_name: Option<String>,
    #[serde(default)]
    default: Option<serde_yaml::Value>,
    #[serde(default)]
    expression_support: ExpressionSupport,
    #[serde(default)]
    required: bool,
}

/// Loads component models and the pojo types they declare.
///
/// Declared types are registered in the loader's catalog, so later files can
/// refer to types declared by earlier ones.
#[derive(Debug, Default)]
pub struct ComponentModelLoader {
    catalog: TypeCatalog,
    object_types: IndexMap<String, ObjectType>,
    components: IndexMap<String, ComponentModel>,
}

impl ComponentModelLoader {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            catalog,
            object_types: IndexMap::new(),
            components: IndexMap::new(),
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn component(&self, name: &str) -> Option<&ComponentModel> {
        self.components.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentModel> {
        self.components.values()
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.object_types.get(name)
    }

    /// Load every component declared in the YAML file at `path`.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<ComponentModel>, ModelError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_str(&content, &path.display().to_string())
    }

    /// Load components from YAML text. `origin` names the source in errors.
    pub fn load_str(&mut self, content: &str, origin: &str) -> Result<Vec<ComponentModel>, ModelError> {
        let file: ModelFile = serde_yaml::from_str(content).map_err(|e| ModelError::Yaml {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

        for definition in &file.types {
            let object = self.declare_type(definition)?;
            self.catalog.register(object.type_ref.clone());
            self.object_types.insert(definition.name.clone(), object);
        }

        let definitions = file.component.into_iter().chain(file.components);
        let mut loaded = Vec::new();
        for definition in definitions {
            let model = self.build_component(definition)?;
            tracing::debug!(
                component = %model.name,
                parameters = model.parameters.len(),
                "loaded component model"
            );
            self.components.insert(model.name.clone(), model.clone());
            loaded.push(model);
        }

        if loaded.is_empty() && file.types.is_empty() {
            return Err(ModelError::Yaml {
                path: origin.to_string(),
                message: "no 'component', 'components' or 'types' section".to_string(),
            });
        }
        Ok(loaded)
    }

    /// Load every `.yaml`/`.yml` file in `dir`, in file name order.
    ///
    /// Files that fail to load are logged and skipped.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, ModelError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| ModelError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            match self.load_file(&path) {
                Ok(models) => count += models.len(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping component model");
                }
            }
        }
        Ok(count)
    }

    /// Parse a type expression such as `list<string>` or
    /// `map<string, Address>` against the known types.
    pub fn parse_type(&self, expression: &str) -> Result<MetadataType, ModelError> {
        let (name, arguments) = split_type_expression(expression)?;
        let argument = |index: usize| -> Result<MetadataType, ModelError> {
            match arguments.get(index) {
                Some(argument) => self.parse_type(argument),
                None => Ok(MetadataType::simple(&types::OBJECT)),
            }
        };
        let argument_type = |index: usize| -> Result<TypeRef, ModelError> {
            match arguments.get(index) {
                Some(argument) => self
                    .catalog
                    .get(argument)
                    .cloned()
                    .ok_or_else(|| ModelError::UnknownType(argument.clone())),
                None => Ok(types::OBJECT.clone()),
            }
        };
        let expect_arguments = |max: usize| -> Result<(), ModelError> {
            if arguments.len() > max {
                return Err(ModelError::InvalidTypeExpression {
                    expression: expression.to_string(),
                    reason: format!("'{}' takes at most {} type arguments", name, max),
                });
            }
            Ok(())
        };

        match name.as_str() {
            "array" => {
                expect_arguments(1)?;
                return Ok(MetadataType::array(None, argument(0)?));
            }
            "dictionary" => {
                expect_arguments(2)?;
                return Ok(MetadataType::dictionary(None, argument(0)?, argument(1)?));
            }
            _ => {}
        }

        if let Some(object) = self.object_types.get(&name) {
            expect_arguments(0)?;
            return Ok(MetadataType::Object(object.clone()));
        }

        let type_ref = self
            .catalog
            .get(&name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownType(name.clone()))?;

        if type_ref.is_collection() {
            expect_arguments(1)?;
            Ok(MetadataType::array(Some(&type_ref), argument(0)?))
        } else if type_ref.is_map() {
            expect_arguments(2)?;
            Ok(MetadataType::dictionary(Some(&type_ref), argument(0)?, argument(1)?))
        } else if type_ref == *types::FUNCTION {
            expect_arguments(2)?;
            Ok(MetadataType::function(&argument_type(0)?, &argument_type(1)?))
        } else {
            expect_arguments(0)?;
            Ok(MetadataType::of_type(&type_ref))
        }
    }

    fn declare_type(&self, definition: &TypeDefinition) -> Result<ObjectType, ModelError> {
        if self.catalog.contains(&definition.name) && !self.object_types.contains_key(&definition.name) {
            return Err(ModelError::InvalidComponent {
                component: definition.name.clone(),
                reason: "type name collides with a built-in type".to_string(),
            });
        }

        let mut fields = Vec::with_capacity(definition.fields.len());
        for field in &definition.fields {
            let mut value_type = self.parse_type(&field.type_expression)?;
            let annotations = value_type.annotations_mut();
            annotations.default = field.default.as_ref().map(yaml_to_value).transpose()?;
            annotations.expression_support = field.expression_support;
            fields.push(ObjectField {
                name: field.name.clone(),
                alias: field.alias.clone(),
                value_type,
                required: field.required,
            });
        }
        Ok(ObjectType::declare(&definition.name, fields))
    }

    fn build_component(&self, definition: ComponentDefinition) -> Result<ComponentModel, ModelError> {
        if definition.name.trim().is_empty() {
            return Err(ModelError::InvalidComponent {
                component: definition.name,
                reason: "component name is empty".to_string(),
            });
        }

        let mut model = ComponentModel::new(definition.name.as_str(), definition.kind);
        model.description = definition.description;
        for parameter in definition.parameters {
            if model.parameter(&parameter.name).is_some() {
                return Err(ModelError::InvalidComponent {
                    component: model.name,
                    reason: format!("parameter '{}' is declared twice", parameter.name),
                });
            }
            let metadata_type = self.parse_type(&parameter.type_expression)?;
            model.parameters.push(ParameterModel {
                name: parameter.name,
                member_name: parameter.member_name,
                metadata_type,
                default: parameter.default.as_ref().map(yaml_to_value).transpose()?,
                expression_support: parameter.expression_support,
                required: parameter.required,
            });
        }
        Ok(model)
    }
}

/// Split `name<arg, arg>` into its name and top-level arguments.
fn split_type_expression(expression: &str) -> Result<(String, Vec<String>), ModelError> {
    let invalid = |reason: &str| ModelError::InvalidTypeExpression {
        expression: expression.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = expression.trim();
    let Some(open) = trimmed.find('<') else {
        if trimmed.is_empty() {
            return Err(invalid("empty type"));
        }
        if trimmed.contains('>') || trimmed.contains(',') {
            return Err(invalid("unbalanced type arguments"));
        }
        return Ok((trimmed.to_string(), Vec::new()));
    };
    if !trimmed.ends_with('>') {
        return Err(invalid("missing closing '>'"));
    }

    let name = trimmed[..open].trim().to_string();
    if name.is_empty() {
        return Err(invalid("missing type name"));
    }

    let inner = &trimmed[open + 1..trimmed.len() - 1];
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid("unbalanced type arguments"))?;
            }
            ',' if depth == 0 => {
                arguments.push(inner[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid("unbalanced type arguments"));
    }
    arguments.push(inner[start..].trim().to_string());
    if arguments.iter().any(String::is_empty) {
        return Err(invalid("empty type argument"));
    }
    Ok((name, arguments))
}

fn yaml_to_value(value: &serde_yaml::Value) -> Result<Value, ModelError> {
    serde_json::to_value(value)
        .map(Value::from)
        .map_err(|e| ModelError::InvalidTypeExpression {
            expression: format!("{:?}", value),
            reason: format!("unsupported default value: {}", e),
        })
}

/// Load the first component declared in the file at `path`.
pub fn load_component_model<P: AsRef<Path>>(
    path: P,
    catalog: &TypeCatalog,
) -> Result<ComponentModel, ModelError> {
    let path = path.as_ref();
    let mut loader = ComponentModelLoader::new(catalog.clone());
    loader
        .load_file(path)?
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::InvalidComponent {
            component: path.display().to_string(),
            reason: "file declares no component".to_string(),
        })
}

/// Load all component models found in `dir`.
pub fn load_component_models_from_dir<P: AsRef<Path>>(
    dir: P,
    catalog: &TypeCatalog,
) -> Result<Vec<ComponentModel>, ModelError> {
    let mut loader = ComponentModelLoader::new(catalog.clone());
    loader.load_dir(dir)?;
    Ok(loader.components().cloned().collect())
}
