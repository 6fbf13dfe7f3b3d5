// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the filename identity codec. Gallery loading parses
// every stored filename, so decode is the hot path.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use nopeek_core::identity::{self, BaseToken};
use nopeek_core::{Alteration, AlterationRecord, FaceMaskStyle, ImageExtension, SensitiveKind};

fn bench_encode(c: &mut Criterion) {
    let base = BaseToken::generate();
    let mut record = AlterationRecord::default();
    record.apply(Alteration::ExifErased);
    record.apply(Alteration::FaceMasked(FaceMaskStyle::Blur));
    record.apply(Alteration::Sensitive(SensitiveKind::LicensePlate));

    c.bench_function("encode (3 flags)", |b| {
        b.iter(|| identity::encode(black_box(&base), Some(black_box(&record)), ImageExtension::Jpg));
    });
}

/// Decode a 200-entry listing, half originals, half sanitized.
fn bench_decode_listing(c: &mut Criterion) {
    let mut record = AlterationRecord::default();
    record.apply(Alteration::ExifErased);
    record.apply(Alteration::Sensitive(SensitiveKind::DocumentFile));
    let names: Vec<String> = (0..100)
        .flat_map(|_| {
            let base = BaseToken::generate();
            [
                identity::encode(&base, None, ImageExtension::Jpg).to_string(),
                identity::encode(&base, Some(&record), ImageExtension::Jpg).to_string(),
            ]
        })
        .collect();

    c.bench_function("decode listing (200 names)", |b| {
        b.iter(|| {
            for name in &names {
                black_box(identity::decode_base(name));
                black_box(identity::decode_record(name));
            }
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode_listing);
criterion_main!(benches);
