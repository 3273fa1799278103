use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use nalt_bind::{Binding, Callback, Field, ImportEntry, MemoryDatabase, Value};
use std::hint::black_box;

fn bench_accessors(c: &mut Criterion) {
    let mut group = c.benchmark_group("accessors");
    let mut b = Binding::new(MemoryDatabase::new());
    let h = b.create();

    group.throughput(Throughput::Elements(Field::ALL.len() as u64));
    group.bench_function("set_get_all_fields", |bench| {
        bench.iter(|| {
            for field in Field::ALL {
                b.set_field(&h, field, &Value::Int(black_box(0x7f))).ok();
                black_box(b.get_field(&h, field));
            }
        })
    });
    group.finish();
}

fn bench_enumeration(c: &mut Criterion) {
    let mut db = MemoryDatabase::new();
    let m = db.add_import_module("KERNEL32.dll");
    for i in 0..1000u64 {
        if i % 4 == 0 {
            db.add_import(m, ImportEntry::by_ordinal(0x1000 + i * 8, i));
        } else {
            db.add_import(m, ImportEntry::by_name(0x1000 + i * 8, format!("Import{}", i)));
        }
    }
    let b = Binding::new(db);
    let cb = Value::Callable(Callback::new(|args| Some(Value::Bool(!args[0].is_none()))));

    let mut group = c.benchmark_group("enumeration");
    group.throughput(Throughput::Elements(1000));
    group.bench_function("enum_import_names_1000", |bench| {
        bench.iter(|| black_box(b.enum_import_names(0, &cb)))
    });
    group.finish();
}

criterion_group!(benches, bench_accessors, bench_enumeration);
criterion_main!(benches);
