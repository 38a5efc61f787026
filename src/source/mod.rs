//! Java front-end: turns a source tree into declaration event streams.
//!
//! Files are parsed in parallel into owned syntax, indexed project-wide, and
//! then flattened into one [`SourceUnit`] per file with every reference
//! resolved against the index.

pub mod events;
pub mod index;
pub mod java;

pub use events::{
    erasure, DeclEvent, EnclosingMethod, FieldDecl, Import, Invocation, MethodDecl, ReturnSite,
    SourceUnit, TypeDecl, TypeKind, TypeRef,
};
pub use index::ProjectIndex;
pub use java::JavaParser;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use index::{BodyScope, Scope};
use java::{BodyItem, FileSyntax, Member, MethodSyntax, TypeSyntax};

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["test", "tests"];

/// Result of loading a source tree.
#[derive(Debug, Default)]
pub struct Project {
    pub units: Vec<SourceUnit>,
    pub files_found: usize,
    pub files_failed: usize,
    pub types_indexed: usize,
}

/// Collect `.java` files under `root`, sorted by path.
///
/// Hidden directories, `test`/`tests` directories and paths matching one of
/// `excluded` (glob patterns relative to `root`) are skipped.
pub fn collect_files(root: &Path, excluded: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let excluded = build_globset(excluded)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
        })
    {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("java")
        {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if excluded.is_match(relative) {
            debug!("Excluded {}", relative.display());
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid exclude glob {:?}", pattern))?);
    }
    Ok(builder.build()?)
}

/// Read a source file, trying UTF-8, then UTF-16 with a byte order mark,
/// then ISO-8859-1.
pub fn read_source(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(decode(&bytes))
}

fn decode(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        if let Ok(s) = std::str::from_utf8(rest) {
            return s.to_string();
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    let utf16 = |rest: &[u8], little: bool| -> Option<String> {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|p| {
                if little {
                    u16::from_le_bytes([p[0], p[1]])
                } else {
                    u16::from_be_bytes([p[0], p[1]])
                }
            })
            .collect();
        String::from_utf16(&units).ok()
    };
    if let Some(s) = bytes.strip_prefix(&[0xFF, 0xFE]).and_then(|r| utf16(r, true)) {
        return s;
    }
    if let Some(s) = bytes.strip_prefix(&[0xFE, 0xFF]).and_then(|r| utf16(r, false)) {
        return s;
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse, index and flatten every Java file under `root`.
pub fn load_project(root: &Path, excluded: &[String]) -> anyhow::Result<Project> {
    let files = collect_files(root, excluded)?;
    let parser = JavaParser::new()?;

    let parsed: Vec<Option<FileSyntax>> = files
        .par_iter()
        .map(|path| match read_source(path).and_then(|src| parser.parse(path, &src)) {
            Ok(syntax) => Some(syntax),
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                None
            }
        })
        .collect();
    let files_failed = parsed.iter().filter(|p| p.is_none()).count();
    let parsed: Vec<FileSyntax> = parsed.into_iter().flatten().collect();

    let index = ProjectIndex::build(&parsed);
    let units = parsed
        .iter()
        .enumerate()
        .map(|(i, syntax)| emit_unit(&index, i, syntax))
        .collect();

    Ok(Project {
        units,
        files_found: files.len(),
        files_failed,
        types_indexed: index.len(),
    })
}

/// Flatten one parsed file. `file` is its position in the indexed file list.
pub fn emit_unit(index: &ProjectIndex, file: usize, syntax: &FileSyntax) -> SourceUnit {
    let mut emitter = Emitter {
        index,
        file,
        package: syntax.package.clone(),
        unit: SourceUnit::new(&syntax.path, syntax.package.clone()),
    };
    for import in &syntax.imports {
        emitter.unit.push(DeclEvent::Import(import.clone()));
    }
    for t in &syntax.types {
        emitter.emit_type(t, &[]);
    }
    emitter.unit
}

struct Emitter<'a> {
    index: &'a ProjectIndex,
    file: usize,
    package: Option<String>,
    unit: SourceUnit,
}

impl Emitter<'_> {
    fn package_components(&self) -> Vec<String> {
        self.package
            .as_deref()
            .map(|p| p.split('.').map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn emit_type(&mut self, t: &TypeSyntax, chain: &[String]) {
        let index = self.index;
        let qualified = if t.is_anonymous {
            String::new()
        } else {
            match chain.last() {
                Some(outer) => format!("{}.{}", outer, t.name),
                None => match self.package.as_deref() {
                    Some(p) if !p.is_empty() => format!("{}.{}", p, t.name),
                    _ => t.name.clone(),
                },
            }
        };
        let (superclass, interfaces) = if t.is_anonymous {
            (None, Vec::new())
        } else {
            index.supertypes(&qualified)
        };

        let decl = TypeDecl {
            qualified: qualified.clone(),
            simple: t.name.clone(),
            package: self.package_components(),
            kind: t.kind,
            is_abstract: t.modifiers.is_abstract,
            is_public: t.modifiers.is_public,
            is_private: t.modifiers.is_private,
            is_nested: !chain.is_empty() || t.is_anonymous,
            is_anonymous: t.is_anonymous,
            superclass,
            interfaces,
        };
        let declaring = decl.to_ref();
        self.unit.push(DeclEvent::TypeEntered(decl));

        let mut inner = chain.to_vec();
        if !t.is_anonymous {
            inner.push(qualified);
        }
        let scope = Scope {
            file: self.file,
            chain: &inner,
        };
        for member in &t.members {
            match member {
                Member::Field(f) => {
                    let field_type = index.resolve_type(&f.type_text, &scope);
                    self.unit.push(DeclEvent::Field(FieldDecl {
                        names: f.names.clone(),
                        field_type,
                    }));
                }
                Member::Method(m) => self.emit_method(m, &inner, &declaring),
                Member::Type(nested) => self.emit_type(nested, &inner),
            }
        }
        self.unit.push(DeclEvent::TypeExited);
    }

    fn emit_method(&mut self, m: &MethodSyntax, chain: &[String], declaring: &TypeRef) {
        let index = self.index;
        let scope = Scope {
            file: self.file,
            chain,
        };
        let parameters = m
            .params
            .iter()
            .map(|p| index.resolve_type(&p.type_text, &scope))
            .collect();
        let return_type = m
            .return_type
            .as_deref()
            .and_then(|r| index.resolve_type(r, &scope));

        self.unit.push(DeclEvent::Method(MethodDecl {
            name: m.name.clone(),
            declaring: Some(declaring.clone()),
            is_constructor: m.is_constructor,
            is_public: m.modifiers.is_public,
            is_abstract: m.modifiers.is_abstract,
            parameters,
            return_type: return_type.clone(),
        }));

        let enclosing = EnclosingMethod {
            name: m.name.clone(),
            is_constructor: m.is_constructor,
            declaring: Some(declaring.clone()),
            return_type,
        };
        let body = BodyScope {
            scope: Scope {
                file: self.file,
                chain,
            },
            params: &m.params,
            locals: &m.locals,
        };
        for item in &m.body {
            match item {
                BodyItem::Invocation(call) => {
                    let resolved = index.resolve_invocation(call, &body);
                    if resolved.is_none() {
                        debug!("Unresolved invocation {} in {}", call.name, m.name);
                    }
                    self.unit.push(DeclEvent::Invocation(resolved));
                }
                BodyItem::Return(expr) => {
                    let expression = expr.as_ref().and_then(|e| index.expr_type(e, &body));
                    self.unit.push(DeclEvent::Return(ReturnSite {
                        enclosing: Some(enclosing.clone()),
                        expression,
                    }));
                }
                BodyItem::Anonymous(t) => self.emit_type(t, chain),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_files_skips_test_dirs_and_globs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/a/Main.java", "class Main {}");
        write(dir.path(), "src/test/a/MainTest.java", "class MainTest {}");
        write(dir.path(), "src/a/tests/Helper.java", "class Helper {}");
        write(dir.path(), "src/gen/Generated.java", "class Generated {}");
        write(dir.path(), ".hidden/Skip.java", "class Skip {}");
        write(dir.path(), "src/a/notes.txt", "not java");

        let files = collect_files(dir.path(), &["src/gen/**".to_string()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Main.java"]);
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        assert_eq!(decode("caf\u{e9}".as_bytes()), "caf\u{e9}");
        assert_eq!(decode(&[b'c', b'a', b'f', 0xE9]), "caf\u{e9}");
        assert_eq!(decode(&[0xFF, 0xFE, b'h', 0, b'i', 0]), "hi");
    }

    #[test]
    fn test_emit_unit_event_order() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "a/Shape.java",
            "package a; public abstract class Shape { abstract void draw(); }",
        );
        write(
            dir.path(),
            "a/Circle.java",
            r#"package a;
import java.util.List;
public class Circle extends Shape {
    private List<Shape> parts;
    public void draw() { helper(); }
    void helper() {}
    Shape self() { return this; }
}"#,
        );
        let project = load_project(dir.path(), &[]).unwrap();
        assert_eq!(project.files_found, 2);
        assert_eq!(project.types_indexed, 2);

        let circle = project
            .units
            .iter()
            .find(|u| u.path.ends_with("Circle.java"))
            .unwrap();
        let tags: Vec<&str> = circle
            .events
            .iter()
            .map(|e| match e {
                DeclEvent::Import(_) => "import",
                DeclEvent::TypeEntered(_) => "enter",
                DeclEvent::TypeExited => "exit",
                DeclEvent::Method(_) => "method",
                DeclEvent::Field(_) => "field",
                DeclEvent::Invocation(_) => "call",
                DeclEvent::Return(_) => "return",
            })
            .collect();
        assert_eq!(
            tags,
            vec!["import", "enter", "field", "method", "call", "method", "method", "return", "exit"]
        );

        match &circle.events[1] {
            DeclEvent::TypeEntered(t) => {
                assert_eq!(t.qualified, "a.Circle");
                assert_eq!(t.superclass.as_ref().unwrap().qualified, "a.Shape");
                assert_eq!(t.package, vec!["a"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &circle.events[2] {
            DeclEvent::Field(f) => {
                assert_eq!(f.field_type.as_ref().unwrap().qualified, "java.util.List<Shape>");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &circle.events[4] {
            DeclEvent::Invocation(Some(inv)) => {
                assert_eq!(inv.declaring.qualified, "a.Circle");
                assert!(!inv.is_abstract);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &circle.events[7] {
            DeclEvent::Return(r) => {
                assert_eq!(r.expression.as_ref().unwrap().qualified, "a.Circle");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
