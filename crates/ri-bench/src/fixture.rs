use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Files written by a fixture generator.
#[derive(Debug, Default)]
pub struct Fixture {
    pub sources: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
}

impl Fixture {
    pub fn file_count(&self) -> usize {
        self.sources.len() + self.headers.len()
    }
}

/// Small C project with known symbols, a guarded header chain, macros and
/// cross-file calls.
pub fn create_geometry_project(root: &Path) -> Fixture {
    let include = root.join("include");
    let src = root.join("src");
    for dir in [&include, &src] {
        fs::create_dir_all(dir).unwrap();
    }

    let geometry_h = include.join("geometry.h");
    fs::write(
        &geometry_h,
        r#"#ifndef GEOMETRY_H
#define GEOMETRY_H

#define GEOMETRY_EPSILON 1e-9

struct point {
    double x;
    double y;
};

double point_distance(struct point a, struct point b);

#endif
"#,
    )
    .unwrap();

    let shapes_h = include.join("shapes.h");
    fs::write(
        &shapes_h,
        r#"#pragma once
#include "geometry.h"

#define SHAPE_MAX 16

enum shape_kind { SHAPE_CIRCLE, SHAPE_POLYGON };

struct shape {
    enum shape_kind kind;
    struct point points[SHAPE_MAX];
    int count;
};

double shape_area(const struct shape *shape);
double shape_perimeter(const struct shape *shape);
"#,
    )
    .unwrap();

    let geometry_c = src.join("geometry.c");
    fs::write(
        &geometry_c,
        r#"#include "geometry.h"

static double square(double v) { return v * v; }

double point_distance(struct point a, struct point b)
{
    return square(a.x - b.x) + square(a.y - b.y);
}
"#,
    )
    .unwrap();

    let shapes_c = src.join("shapes.c");
    fs::write(
        &shapes_c,
        r#"#include "shapes.h"

double shape_area(const struct shape *shape)
{
    double area = 0;
    for (int i = 0; i < shape->count && i < SHAPE_MAX; i++) {
        area += shape->points[i].x * shape->points[i].y;
    }
    return area;
}

double shape_perimeter(const struct shape *shape)
{
    double total = 0;
    for (int i = 1; i < shape->count; i++) {
        total += point_distance(shape->points[i - 1], shape->points[i]);
    }
    return total;
}
"#,
    )
    .unwrap();

    let main_c = src.join("main.c");
    fs::write(
        &main_c,
        r#"#include "shapes.h"

#ifdef GEOMETRY_EPSILON
int shape_count = SHAPE_MAX;
#endif

int main(void)
{
    struct shape square_shape = { SHAPE_POLYGON, { { 0, 0 }, { 1, 1 } }, 2 };
    return shape_area(&square_shape) > 0 ? 0 : 1;
}
"#,
    )
    .unwrap();

    Fixture {
        sources: vec![geometry_c, shapes_c, main_c],
        headers: vec![geometry_h, shapes_h],
    }
}

/// A project of `modules` source/header pairs. Every source includes its own
/// header and up to three earlier ones, chosen by `seed`, and calls into
/// them.
pub fn create_scaled_project(root: &Path, modules: usize, seed: u64) -> Fixture {
    let include = root.join("include");
    let src = root.join("src");
    for dir in [&include, &src] {
        fs::create_dir_all(dir).unwrap();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut fixture = Fixture::default();
    for i in 0..modules {
        let header = include.join(format!("mod_{i}.h"));
        fs::write(&header, module_header(i)).unwrap();
        fixture.headers.push(header);

        let dependencies: Vec<usize> = if i == 0 {
            Vec::new()
        } else {
            let count = rng.gen_range(0..=3.min(i));
            (0..count).map(|_| rng.gen_range(0..i)).collect()
        };
        let source = src.join(format!("mod_{i}.c"));
        fs::write(&source, module_source(i, &dependencies)).unwrap();
        fixture.sources.push(source);
    }
    fixture
}

fn module_header(i: usize) -> String {
    format!(
        r#"#ifndef MOD_{i}_H
#define MOD_{i}_H

#define MOD_{i}_LIMIT {limit}

struct record_{i} {{
    int id;
    int value;
}};

int mod_{i}_process(struct record_{i} *record);
int mod_{i}_validate(int value);

#endif
"#,
        limit = 16 + i
    )
}

fn module_source(i: usize, dependencies: &[usize]) -> String {
    let mut text = format!("#include \"mod_{i}.h\"\n");
    for dependency in dependencies {
        text.push_str(&format!("#include \"mod_{dependency}.h\"\n"));
    }
    text.push_str(&format!(
        r#"
int mod_{i}_validate(int value)
{{
    return value >= 0 && value < MOD_{i}_LIMIT;
}}

int mod_{i}_process(struct record_{i} *record)
{{
    int result = mod_{i}_validate(record->value);
"#
    ));
    for dependency in dependencies {
        text.push_str(&format!(
            "    result += mod_{dependency}_validate(record->id);\n"
        ));
    }
    text.push_str("    return result;\n}\n");
    text
}

/// Set the modification time of `path` to `secs` after the epoch.
pub fn touch(path: &Path, secs: u64) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

/// Rewrite `path` and move its modification time to `secs`.
pub fn rewrite(path: &Path, content: &str, secs: u64) {
    fs::write(path, content).unwrap();
    touch(path, secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_project_is_deterministic() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        create_scaled_project(a.path(), 12, 7);
        create_scaled_project(b.path(), 12, 7);
        for i in 0..12 {
            let name = format!("src/mod_{i}.c");
            assert_eq!(
                fs::read_to_string(a.path().join(&name)).unwrap(),
                fs::read_to_string(b.path().join(&name)).unwrap()
            );
        }
    }

    #[test]
    fn sources_only_include_earlier_modules() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = create_scaled_project(dir.path(), 8, 3);
        assert_eq!(fixture.file_count(), 16);
        for (i, source) in fixture.sources.iter().enumerate() {
            let text = fs::read_to_string(source).unwrap();
            for line in text.lines().filter(|l| l.starts_with("#include")) {
                let n: usize = line
                    .trim_start_matches("#include \"mod_")
                    .trim_end_matches(".h\"")
                    .parse()
                    .unwrap();
                assert!(n <= i);
            }
        }
    }
}
