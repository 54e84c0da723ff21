use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use isoc::*;

// Sample declaration modules of varying complexity
const SIMPLE_ACTOR: &str = r#"
actor Counter {
  var count: Int
  async func bump() { write count }
}
"#;

const BANK: &str = r#"
actor BankAccount {
  let accountNumber: Int
  var balance: Double
  func depositSynchronously(amount: Double) { read balance
    write balance }
  async func deposit(amount: Double) { call depositSynchronously(amount) }
  async func transfer(amount: Double, to: BankAccount) {
    read balance
    write balance
    await to.deposit(amount)
  }
}

func payday(account: BankAccount, amount: Double) {
  await account.deposit(amount)
}
"#;

const UI_HIERARCHY: &str = r#"
global actor UIActor { static let shared: UIActor }
global actor DbActor { static let shared: DbActor }

protocol Drawable { func draw() }

@UIActor class View : NSObject, Drawable {
  func draw() { }
  func layout() { call draw() }
}
class Button : View { func draw() { } }
class Toggle : Button { func draw() { } @actorIndependent func hash() { } }
@DbActor class Store { func save() { } }

func forEach(body: fn) { }
func later(body: escaping fn) { }

@UIActor func refresh(view: View, store: Store) {
  call forEach({ call view.layout() })
  call later({ call view.draw() })
  await store.save()
}
"#;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, source) in [
        ("simple", SIMPLE_ACTOR),
        ("bank", BANK),
        ("ui", UI_HIERARCHY),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| {
                let result = parser::parse(black_box(source));
                black_box(&result.program);
            });
        });
    }

    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("check");
    let options = pipeline::CheckOptions::default();

    for (name, source) in [
        ("simple", SIMPLE_ACTOR),
        ("bank", BANK),
        ("ui", UI_HIERARCHY),
    ] {
        let module = match pipeline::parse_module("Bench", source) {
            Ok(m) => m,
            Err(errors) => panic!("{} does not parse: {:?}", name, errors),
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &module, |b, module| {
            b.iter(|| {
                let state = pipeline::check_modules(vec![module.clone()], &options);
                black_box(state.diagnostics.len());
            });
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let options = pipeline::CheckOptions::default();

    // Deep subclass chains exercise inherited-category memoization.
    for depth in [8usize, 64, 256] {
        let mut source = String::from("global actor UIActor { static let shared: UIActor }\n");
        source.push_str("@UIActor class C0 { func f() { } }\n");
        for i in 1..depth {
            source.push_str(&format!("class C{} : C{} {{ func f() {{ }} }}\n", i, i - 1));
        }
        let module = match pipeline::parse_module("Chain", &source) {
            Ok(m) => m,
            Err(errors) => panic!("chain does not parse: {:?}", errors),
        };
        let resolved = resolve::resolve(&[module], &options);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &resolved.table, |b, table| {
            b.iter(|| black_box(classify::classify_all(black_box(table))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_check, bench_classify);
criterion_main!(benches);
