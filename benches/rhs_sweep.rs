//! Throughput of the per-stage grid sweeps.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cosmo_rs::bssn::fields::FieldId;
use cosmo_rs::bssn::{Bssn, BssnOptions};
use cosmo_rs::solver::{FrwRef, RkStage};

fn perturbed_bssn(n: usize) -> Bssn {
    let mut bssn = Bssn::new(n, n, n, 0.01, BssnOptions::synchronous(1.0));
    // Non-trivial data so the sweep exercises every term.
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let x = (i * 7 + j * 3 + k) as f64 / n as f64;
                bssn.fields_mut()
                    .a_mut(FieldId::Phi)
                    .set(i, j, k, 1e-3 * (x * 6.28).sin());
                bssn.fields_mut()
                    .a_mut(FieldId::Gamma12)
                    .set(i, j, k, 1e-4 * (x * 12.56).cos());
                bssn.fields_mut().a_mut(FieldId::K).set(i, j, k, -3.0);
            }
        }
    }
    bssn
}

fn bench_evolve_stage(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolve_stage");
    for n in [16usize, 32] {
        let mut bssn = perturbed_bssn(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                bssn.evolve_stage(black_box(&FrwRef::default()));
            });
        });
    }
    group.finish();
}

fn bench_full_step(c: &mut Criterion) {
    let mut bssn = perturbed_bssn(16);
    c.bench_function("full_rk4_step_16", |b| {
        b.iter(|| {
            bssn.step_init();
            for stage in RkStage::ALL {
                bssn.evolve_stage(&FrwRef::default());
                bssn.rk_finalize(stage);
            }
            bssn.step_term();
        });
    });
}

criterion_group!(benches, bench_evolve_stage, bench_full_step);
criterion_main!(benches);
