use casebook::model::{CaseType, Module, Named, Priority, TestCase, TestSuite};
use casebook::multiselect::MultiSelect;
use casebook::tree::{ProjectTree, Scope};
use chrono::Utc;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::collections::HashSet;

/// Generate a project with `modules` modules, 4 suites per module and
/// `cases_per_suite` cases per suite.
fn generate_project(modules: usize, cases_per_suite: usize) -> (Vec<Module>, Vec<TestSuite>, Vec<TestCase>) {
    let now = Utc::now();
    let mut module_list = Vec::with_capacity(modules);
    let mut suite_list = Vec::with_capacity(modules * 4);
    let mut case_list = Vec::with_capacity(modules * 4 * cases_per_suite);

    for m in 0..modules {
        let module_id = format!("mod-{}", m);
        module_list.push(Module {
            id: module_id.clone(),
            project_id: "proj".to_string(),
            name: format!("Module {:03}", modules - m),
            description: None,
            created_at: now,
            updated_at: now,
        });

        for s in 0..4 {
            let suite_id = format!("suite-{}-{}", m, s);
            suite_list.push(TestSuite {
                id: suite_id.clone(),
                module: Named::new(&module_id, format!("Module {:03}", modules - m)),
                name: format!("Suite {}", 4 - s),
                description: None,
                created_at: now,
                updated_at: now,
            });

            for c in 0..cases_per_suite {
                case_list.push(TestCase {
                    id: format!("tc-{}-{}-{}", m, s, c),
                    code: None,
                    project_id: "proj".to_string(),
                    module_id: module_id.clone(),
                    test_suite: Named::new(&suite_id, format!("Suite {}", 4 - s)),
                    title: format!("Case {}", c),
                    description: "Generated for benchmarking".to_string(),
                    priority: Priority::Medium,
                    case_type: CaseType::Functional,
                    preconditions: None,
                    steps: "1. Step".to_string(),
                    expected_results: "Result".to_string(),
                    status: None,
                    executed_at: None,
                    executed_by: None,
                    actual_results: None,
                    notes: None,
                    created_at: now,
                    updated_at: now,
                });
            }
        }
    }

    (module_list, suite_list, case_list)
}

fn bench_tree_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_building");

    for modules in [5, 20, 80] {
        let (m, s, cases) = generate_project(modules, 10);
        group.bench_with_input(BenchmarkId::new("build", modules), &modules, |b, _| {
            b.iter(|| ProjectTree::build(black_box(m.clone()), black_box(s.clone()), black_box(cases.clone())))
        });

        let tree = ProjectTree::build(m, s, cases);
        let mut selected = MultiSelect::new();
        selected.select_all(tree.scope_ids(&Scope::Module("mod-0".to_string()), &HashSet::new()));
        let exclude: HashSet<String> = tree
            .scope_ids(&Scope::Suite("suite-1-0".to_string()), &HashSet::new())
            .into_iter()
            .collect();

        group.bench_with_input(BenchmarkId::new("flatten", modules), &modules, |b, _| {
            b.iter(|| tree.flatten(black_box(&selected), black_box(&exclude)))
        });
    }

    group.finish();
}

fn bench_scope_toggle(c: &mut Criterion) {
    let mut group = c.benchmark_group("scope_toggle");
    let (m, s, cases) = generate_project(40, 25);
    let tree = ProjectTree::build(m, s, cases);
    let scope = tree.scope_ids(&Scope::Project, &HashSet::new());

    group.bench_function("4000_cases_select_all_then_clear", |b| {
        b.iter(|| {
            let mut selected = MultiSelect::new();
            selected.toggle_scope(black_box(&scope));
            selected.toggle_scope(black_box(&scope))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_tree_building, bench_scope_toggle);
criterion_main!(benches);
