use criterion::{Criterion, criterion_group, criterion_main};
use sntpm::packet::{decode, seconds_to_timestamp, timestamp_to_seconds};
use sntpm::{Mode, NtpTimestamp, PacketBuilder, ReferenceId, process_response};
use std::hint::black_box;

fn reply() -> PacketBuilder {
    PacketBuilder::new()
        .with_version(4)
        .with_mode(Mode::Server)
        .with_stratum(2)
        .with_poll(6)
        .with_precision(-20)
        .with_reference_id(ReferenceId::new([17, 253, 54, 253]))
        .with_originate_timestamp(NtpTimestamp::new(0xdad8_733b, 0x96d4_628f))
        .with_receive_timestamp(NtpTimestamp::new(0xdad8_733b, 0x9887_8c9e))
        .with_transmit_timestamp(NtpTimestamp::new(0xdad8_733b, 0xa759_fb29))
}

fn criterion_benchmark(c: &mut Criterion) {
    let packet = reply();
    let raw = packet.encode();
    let originate = NtpTimestamp::new(0xdad8_733b, 0x96d4_628f);
    let destination = NtpTimestamp::new(0xdad8_733c, 0);

    c.bench_function("encode", |b| {
        b.iter(|| black_box(black_box(&packet).encode()));
    });

    c.bench_function("decode", |b| {
        b.iter(|| black_box(decode(black_box(&raw.0))));
    });

    c.bench_function("process_response", |b| {
        let received = decode(&raw.0).unwrap();

        b.iter(|| {
            black_box(process_response(
                black_box(&received),
                originate,
                destination,
            ))
        });
    });

    c.bench_function("timestamp_conversion", |b| {
        b.iter(|| {
            black_box(seconds_to_timestamp(timestamp_to_seconds(black_box(
                originate,
            ))))
        });
    });
}

criterion_group!(codec_benches, criterion_benchmark);
criterion_main!(codec_benches);
