use glob::glob;
use std::collections::BTreeMap;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Collects `NAME FRAGMENT` lines from every `patterns/*.pattern` file.
fn load_templates() -> BTreeMap<String, (String, PathBuf)> {
    let mut templates: BTreeMap<String, (String, PathBuf)> = BTreeMap::new();

    for path in glob("patterns/*.pattern").expect("invalid template glob") {
        let path = path.expect("unreadable template path");
        println!("cargo:rerun-if-changed={}", path.display());
        let contents = fs::read_to_string(&path).expect("unreadable template file");

        for (number, line) in contents.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, fragment)) = line.split_once(' ') else {
                panic!("{}:{}: expected `NAME FRAGMENT`", path.display(), number + 1);
            };
            if let Some((_, first)) = templates.get(name) {
                panic!(
                    "{}:{}: template {name} is already defined in {}",
                    path.display(),
                    number + 1,
                    first.display()
                );
            }
            templates.insert(name.to_string(), (fragment.trim().to_string(), path.clone()));
        }
    }

    templates
}

fn main() {
    println!("cargo:rerun-if-changed=patterns");

    let templates = load_templates();
    let mut output = String::new();

    output.push_str("static DEFAULT_TEMPLATES: &[(&str, &str)] = &[\n");
    for (name, (fragment, _)) in &templates {
        assert!(
            !fragment.contains("\"#"),
            "template {name} cannot be embedded as a raw string"
        );
        writeln!(output, "\t(\"{name}\", r#\"{fragment}\"#),").expect("write to string");
    }
    output.push_str("];\n");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("default_templates.rs");
    fs::write(dest_path, output).expect("cannot write default_templates.rs");
}
