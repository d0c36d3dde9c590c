use crate::{
    errors::{FileOperation, IoError},
    vfs::{VirtualEntry, VirtualFS},
};
use indexmap::IndexMap;
use miette::Diagnostic;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tera::{Context, Tera};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("I/O error within template domain")]
    #[diagnostic(code(packager::template::io))]
    Io(#[from] IoError),

    #[error("Error occurred attempting to initialize tera instance")]
    #[diagnostic(code(packager::template::tera_instance_initialization))]
    TeraInstanceInitialization {
        #[source]
        source: tera::Error,
    },

    #[error("Error occurred attempting to render template '{name}'")]
    #[diagnostic(
        code(packager::template::render),
        help("Check that every token used by the template is provided")
    )]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("Destination pattern '{pattern}' rendered to an empty path segment")]
    #[diagnostic(code(packager::template::empty_segment))]
    EmptySegment { pattern: String },
}

/// A bundled template and where, relative to the package root, its output lands.
/// The destination is rendered with the same tokens as the template body.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFile {
    pub template: &'static str,
    pub destination: &'static str,
}

/// A bundled file copied verbatim into the package.
#[derive(Debug, Clone, Copy)]
pub struct StaticFile {
    pub destination: &'static str,
    pub contents: &'static str,
}

const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    (
        "resource_controller",
        include_str!("../templates/resource_controller.php.tera"),
    ),
    ("facade", include_str!("../templates/facade.php.tera")),
    ("config", include_str!("../templates/config.php.tera")),
    ("repository", include_str!("../templates/repository.php.tera")),
    ("routes", include_str!("../templates/routes.php.tera")),
    (
        "service_provider",
        include_str!("../templates/service_provider.php.tera"),
    ),
    (
        "skeleton_class",
        include_str!("../templates/skeleton_class.php.tera"),
    ),
    ("test_case", include_str!("../templates/test_case.php.tera")),
    ("index_blade", include_str!("../templates/index.blade.php.tera")),
];

pub const PACKAGE_FILES: &[TemplateFile] = &[
    TemplateFile {
        template: "resource_controller",
        destination: "src/Controllers/{{ package_name }}Controller.php",
    },
    TemplateFile {
        template: "facade",
        destination: "src/Facades/{{ package_name }}.php",
    },
    TemplateFile {
        template: "config",
        destination: "src/config/{{ config_file }}.php",
    },
    TemplateFile {
        template: "repository",
        destination: "src/Repositories/{{ package_name }}Repository.php",
    },
    TemplateFile {
        template: "routes",
        destination: "src/routes.php",
    },
    TemplateFile {
        template: "service_provider",
        destination: "src/{{ package_name }}ServiceProvider.php",
    },
    TemplateFile {
        template: "skeleton_class",
        destination: "src/{{ package_name }}.php",
    },
    TemplateFile {
        template: "index_blade",
        destination: "src/resources/views/index.blade.php",
    },
    TemplateFile {
        template: "test_case",
        destination: "tests/TestCase.php",
    },
];

pub const STATIC_FILES: &[StaticFile] = &[
    StaticFile {
        destination: "phpunit.xml",
        contents: include_str!("../files/phpunit.xml"),
    },
    StaticFile {
        destination: ".gitignore",
        contents: include_str!("../files/gitignore"),
    },
    StaticFile {
        destination: ".env.testing",
        contents: include_str!("../files/env.testing"),
    },
    StaticFile {
        destination: ".gitlab-ci.yml",
        contents: include_str!("../files/gitlab-ci.yml"),
    },
];

/// Makes a [`Context`] out of a token map.
fn make_tera_context(tokens: &IndexMap<String, String>) -> Context {
    let mut context = Context::new();

    for (token, value) in tokens {
        context.insert(token, value);
    }

    context
}

/// The bundled templates, parsed once per run.
pub struct Templates {
    tera: Tera,
}
impl Templates {
    pub fn bundled() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        tera.add_raw_templates(BUNDLED_TEMPLATES.iter().copied())
            .map_err(|source| TemplateError::TeraInstanceInitialization { source })?;

        Ok(Self { tera })
    }

    /// Renders the template registered under `name` with `tokens`.
    pub fn render(
        &self,
        name: &str,
        tokens: &IndexMap<String, String>,
    ) -> Result<String, TemplateError> {
        self.tera
            .render(name, &make_tera_context(tokens))
            .map_err(|source| TemplateError::Render {
                name: name.to_string(),
                source,
            })
    }

    /// Renders each segment of a destination pattern. An empty segment is an error since it
    /// would silently move the file up a directory.
    pub fn render_path(
        &mut self,
        pattern: &str,
        tokens: &IndexMap<String, String>,
    ) -> Result<PathBuf, TemplateError> {
        let context = make_tera_context(tokens);
        let mut result = PathBuf::new();

        for segment in pattern.split('/') {
            let rendered =
                self.tera
                    .render_str(segment, &context)
                    .map_err(|source| TemplateError::Render {
                        name: pattern.to_string(),
                        source,
                    })?;

            let rendered = rendered.trim();

            if rendered.is_empty() {
                return Err(TemplateError::EmptySegment {
                    pattern: pattern.to_string(),
                });
            }

            result.push(rendered);
        }

        Ok(result)
    }

    /// Stages every bundled file, rendered, relative to the package root.
    pub fn stage(&mut self, tokens: &IndexMap<String, String>) -> Result<VirtualFS, TemplateError> {
        let mut vfs = VirtualFS::new();

        for file in PACKAGE_FILES {
            let destination = self.render_path(file.destination, tokens)?;
            let content = self.render(file.template, tokens)?;

            vfs.entries.push(VirtualEntry::file(destination, content));
        }

        for file in STATIC_FILES {
            vfs.entries
                .push(VirtualEntry::file(file.destination, file.contents.to_string()));
        }

        Ok(vfs)
    }
}

/// Opens `old_file`, replaces every token with its value in map order, and saves the result to
/// `new_file`, or back to `old_file` when `None`.
pub fn replace_and_save(
    old_file: &Path,
    replacements: &IndexMap<String, String>,
    new_file: Option<&Path>,
) -> Result<(), IoError> {
    let mut contents = fs::read_to_string(old_file)
        .map_err(|error| IoError::new(FileOperation::Read, old_file.to_path_buf(), error))?;

    for (token, value) in replacements {
        contents = contents.replace(token.as_str(), value);
    }

    let new_file = new_file.unwrap_or(old_file);

    fs::write(new_file, contents)
        .map_err(|error| IoError::new(FileOperation::Write, new_file.to_path_buf(), error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::PackageNames;

    fn tokens() -> IndexMap<String, String> {
        PackageNames::new("acme", "blog-engine").unwrap().tokens()
    }

    #[test]
    fn test_render_facade() {
        let templates = Templates::bundled().unwrap();

        let rendered = templates.render("facade", &tokens()).unwrap();

        assert!(rendered.contains("namespace Acme\\BlogEngine\\Facades;"));
        assert!(rendered.contains("class BlogEngine extends Facade"));
        assert!(rendered.contains("return 'blog.engine';"));
    }

    #[test]
    fn test_render_service_provider() {
        let templates = Templates::bundled().unwrap();

        let rendered = templates.render("service_provider", &tokens()).unwrap();

        assert!(rendered.contains("class BlogEngineServiceProvider extends ServiceProvider"));
        assert!(rendered.contains("'/config/blogengine.php'"));
        assert!(rendered.contains("'Acme\\BlogEngine\\Controllers'"));
        assert!(rendered.contains("new \\Acme\\BlogEngine\\BlogEngine();"));
    }

    #[test]
    fn test_render_unknown_template_fails() {
        let templates = Templates::bundled().unwrap();

        let error = templates.render("missing", &tokens()).unwrap_err();

        assert!(matches!(error, TemplateError::Render { name, .. } if name == "missing"));
    }

    #[test]
    fn test_render_path() {
        let mut templates = Templates::bundled().unwrap();

        let path = templates
            .render_path("src/Controllers/{{ package_name }}Controller.php", &tokens())
            .unwrap();

        assert_eq!(path, PathBuf::from("src/Controllers/BlogEngineController.php"));
    }

    #[test]
    fn test_render_path_rejects_empty_segment() {
        let mut templates = Templates::bundled().unwrap();

        let error = templates
            .render_path("src/{{ nothing | default(value='') }}/x.php", &tokens())
            .unwrap_err();

        assert!(matches!(error, TemplateError::EmptySegment { .. }));
    }

    #[test]
    fn test_stage_covers_every_bundled_file() {
        let mut templates = Templates::bundled().unwrap();

        let vfs = templates.stage(&tokens()).unwrap();
        let destinations: Vec<_> = vfs.entries.iter().map(|e| e.destination.clone()).collect();

        assert_eq!(destinations.len(), PACKAGE_FILES.len() + STATIC_FILES.len());
        assert!(destinations.contains(&PathBuf::from("src/config/blogengine.php")));
        assert!(destinations.contains(&PathBuf::from("tests/TestCase.php")));
        assert!(destinations.contains(&PathBuf::from(".gitlab-ci.yml")));
        assert!(vfs.entries.iter().all(|e| e.is_file));
    }

    #[test]
    fn test_replace_and_save_in_place_and_to_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let old_file = dir.path().join("README.md");
        fs::write(&old_file, "# :package_name by :vendor").unwrap();

        let mut replacements = IndexMap::new();
        replacements.insert(":package_name".to_string(), "blog".to_string());
        replacements.insert(":vendor".to_string(), "acme".to_string());

        let new_file = dir.path().join("README.out.md");
        replace_and_save(&old_file, &replacements, Some(&new_file)).unwrap();
        assert_eq!(fs::read_to_string(&new_file).unwrap(), "# blog by acme");
        assert_eq!(
            fs::read_to_string(&old_file).unwrap(),
            "# :package_name by :vendor"
        );

        replace_and_save(&old_file, &replacements, None).unwrap();
        assert_eq!(fs::read_to_string(&old_file).unwrap(), "# blog by acme");
    }
}
