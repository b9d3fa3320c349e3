//! Template sets.
//!
//! An app accumulates template files with [`App::template`](crate::App::template);
//! they are compiled once, when the app becomes a [`Dispatcher`](crate::Dispatcher),
//! never while serving. Each template is named after its file name, so
//! `views/index.html` renders as `"index.html"`.
//!
//! Mounted apps keep their own set, keyed by mount prefix. A response picks
//! the set mounted under the most specific prefix of its request path and
//! falls back to the application's own set.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::Tera;

use crate::error::Error;
use crate::prefix::{Matching, PrefixMap};

/// One compiled group of templates.
pub(crate) struct TemplateSet {
    tera: Tera,
    first: Option<String>,
}

impl TemplateSet {
    pub(crate) fn compile<P: AsRef<Path>>(files: &[P]) -> Result<Self, Error> {
        let mut tera = Tera::default();
        tera.add_template_files(files.iter().map(|p| (p.as_ref(), Some(template_name(p.as_ref())))))?;
        let first = files.first().map(|p| template_name(p.as_ref()));
        Ok(Self { tera, first })
    }

    pub(crate) fn render(&self, name: &str, data: &impl Serialize) -> Result<String, Error> {
        let context = tera::Context::from_serialize(data)?;
        Ok(self.tera.render(name, &context)?)
    }

    pub(crate) fn render_default(&self, data: &impl Serialize) -> Result<String, Error> {
        let name = self.first.as_deref().ok_or_else(|| Error::NoTemplate(String::new()))?;
        self.render(name, data)
    }
}

/// Every template set of a composed application.
pub(crate) struct Views {
    root: Option<TemplateSet>,
    mounted: PrefixMap<TemplateSet>,
    matching: Matching,
}

impl Views {
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self { root: None, mounted: PrefixMap::new(), matching: Matching::default() }
    }

    /// Compiles the root files and every mounted group.
    ///
    /// With `root_dir` set (serverless mode) every file path is resolved
    /// under it.
    pub(crate) fn compile(
        root: &[PathBuf],
        mounted: &PrefixMap<Vec<PathBuf>>,
        matching: Matching,
        root_dir: Option<&Path>,
    ) -> Result<Self, Error> {
        let locate = |files: &[PathBuf]| -> Vec<PathBuf> {
            match root_dir {
                Some(dir) => files.iter().map(|f| dir.join(f)).collect(),
                None => files.to_vec(),
            }
        };

        let root = if root.is_empty() { None } else { Some(TemplateSet::compile(&locate(root))?) };
        let mut sets = PrefixMap::new();
        for (prefix, files) in mounted.iter() {
            if !files.is_empty() {
                sets.insert(prefix, TemplateSet::compile(&locate(files.as_slice()))?);
            }
        }
        Ok(Self { root, mounted: sets, matching })
    }

    /// The set serving `path`.
    pub(crate) fn select(&self, path: &str) -> Option<&TemplateSet> {
        self.mounted
            .resolve(path, self.matching)
            .map(|(_, set)| set)
            .or(self.root.as_ref())
    }
}

fn template_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn templates_are_named_after_their_file() {
        let dir = tempfile::tempdir().unwrap();
        let index = write(dir.path(), "index.html", "<h1>{{ title }}</h1>");
        let set = TemplateSet::compile(&[index]).unwrap();

        let html = set.render("index.html", &HashMap::from([("title", "hi")])).unwrap();
        assert_eq!(html, "<h1>hi</h1>");
        assert_eq!(set.render_default(&HashMap::from([("title", "<b>")])).unwrap(), "<h1>&lt;b&gt;</h1>");
    }

    #[test]
    fn mounted_sets_win_over_the_root_set() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(dir.path(), "root.html", "root");
        let admin = write(dir.path(), "admin.html", "admin");

        let mut mounted = PrefixMap::new();
        mounted.insert("/admin", vec![admin]);
        let views = Views::compile(&[root], &mounted, Matching::Prefix, None).unwrap();

        let data = HashMap::<&str, &str>::new();
        assert_eq!(views.select("/admin/users").unwrap().render_default(&data).unwrap(), "admin");
        assert_eq!(views.select("/home").unwrap().render_default(&data).unwrap(), "root");
    }

    #[test]
    fn no_sets_selects_nothing() {
        assert!(Views::empty().select("/").is_none());
    }

    #[test]
    fn missing_file_fails_compilation() {
        let err = TemplateSet::compile(&["/definitely/not/here.html"]).err().unwrap();
        assert!(matches!(err, Error::Template(_)));
    }
}
