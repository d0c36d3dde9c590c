use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("invalid {kind} name: '{value}'")]
#[diagnostic(
    code(packager::names::invalid),
    help("Use ASCII letters, digits, '-' or '_' only, e.g. `packager new acme blog-engine`")
)]
pub struct InvalidName {
    pub kind: &'static str,
    pub value: String,
}

/// Every name derived from the `vendor` and `name` a package is generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNames {
    pub vendor: String,
    pub name: String,
    /// StudlyCase class name of the package, e.g. `BlogEngine`.
    pub package_name: String,
    /// PHP namespace root, e.g. `Acme\BlogEngine`.
    pub namespace: String,
}
impl PackageNames {
    pub fn new(vendor: &str, name: &str) -> Result<Self, InvalidName> {
        validate("vendor", vendor)?;
        validate("package", name)?;

        let package_name = studly(name);
        let namespace = format!("{}\\{}", studly(vendor), package_name);

        Ok(Self {
            vendor: vendor.to_string(),
            name: name.to_string(),
            package_name,
            namespace,
        })
    }

    pub fn composer_name(&self) -> String {
        format!("{}/{}", self.vendor, self.name).to_lowercase()
    }

    pub fn config_file(&self) -> String {
        self.package_name.to_lowercase()
    }

    pub fn service_name(&self) -> String {
        service_name(&self.package_name)
    }

    pub fn sub_namespace(&self, segment: &str) -> String {
        format!("{}\\{}", self.namespace, segment)
    }

    /// Token map fed to the bundled templates.
    pub fn tokens(&self) -> IndexMap<String, String> {
        let mut tokens = IndexMap::new();

        tokens.insert("vendor".to_string(), self.vendor.clone());
        tokens.insert("name".to_string(), self.name.clone());
        tokens.insert("package_name".to_string(), self.package_name.clone());
        tokens.insert("class_name".to_string(), self.package_name.clone());
        tokens.insert("namespace".to_string(), self.namespace.clone());
        tokens.insert("composer_name".to_string(), self.composer_name());
        tokens.insert("config_file".to_string(), self.config_file());
        tokens.insert("service_name".to_string(), self.service_name());
        tokens.insert(
            "controller_namespace".to_string(),
            self.sub_namespace("Controllers"),
        );
        tokens.insert("facade_namespace".to_string(), self.sub_namespace("Facades"));
        tokens.insert(
            "repository_namespace".to_string(),
            self.sub_namespace("Repositories"),
        );
        tokens.insert(
            "service_provider_namespace".to_string(),
            self.namespace.clone(),
        );
        tokens.insert("tests_namespace".to_string(), self.sub_namespace("Tests"));

        tokens
    }

    /// Literal replacements for the placeholders shipped inside the downloaded skeleton.
    ///
    /// Longer tokens come first since replacement is applied in order.
    pub fn skeleton_replacements(&self) -> IndexMap<String, String> {
        let escaped_namespace = self.namespace.replace('\\', "\\\\");
        let mut replacements = IndexMap::new();

        replacements.insert(
            ":vendor\\\\:package_name\\\\".to_string(),
            format!("{escaped_namespace}\\\\"),
        );
        replacements.insert(":vendor\\:package_name".to_string(), self.namespace.clone());
        replacements.insert(
            "thephpleague/:package_name".to_string(),
            self.composer_name(),
        );
        replacements.insert("league/:package_name".to_string(), self.composer_name());
        replacements.insert(":vendor".to_string(), self.vendor.to_lowercase());
        replacements.insert(":package_name".to_string(), self.name.to_lowercase());

        replacements
    }
}

fn validate(kind: &'static str, value: &str) -> Result<(), InvalidName> {
    let is_valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && value.chars().any(|c| c.is_ascii_alphanumeric());

    if is_valid {
        Ok(())
    } else {
        Err(InvalidName {
            kind,
            value: value.to_string(),
        })
    }
}

/// `blog-engine` -> `BlogEngine`. Words are split on `-`, `_` and whitespace; the rest of each
/// word keeps its case.
pub fn studly(value: &str) -> String {
    value
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Dotted, lowercase service container key for a class name.
///
/// A `.` is inserted before every run of uppercase letters; a run ends before an uppercase
/// letter that is followed by a lowercase one. `MyPackage` -> `my.package`,
/// `HTTPClient` -> `http.client`.
pub fn service_name(package_name: &str) -> String {
    let chars: Vec<char> = package_name.chars().collect();
    let mut dotted = String::with_capacity(chars.len() + 4);

    for (index, &current) in chars.iter().enumerate() {
        if current.is_ascii_uppercase() {
            let previous_upper = index > 0 && chars[index - 1].is_ascii_uppercase();
            let next_lower = chars
                .get(index + 1)
                .is_some_and(|next| next.is_ascii_lowercase());

            if !previous_upper || next_lower {
                dotted.push('.');
            }
        }

        dotted.push(current.to_ascii_lowercase());
    }

    dotted.trim_start_matches('.').to_string()
}
