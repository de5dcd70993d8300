use charbuf::CharBuffer;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const DATA_SZ: usize = 256 * 1024;

pub fn criterion_benchmark(c: &mut Criterion) {
    let data: Vec<u8> = (0..DATA_SZ).map(|i| (i & 0xFF) as u8).collect();

    c.bench_function("charbuf 256k/64", |bench| {
        bench.iter(|| relay::<64>(black_box(&data)))
    });

    c.bench_function("charbuf 256k/4096", |bench| {
        bench.iter(|| relay::<4096>(black_box(&data)))
    });

    c.bench_function("std channel 256k", |bench| {
        bench.iter(|| {
            let (prod, cons) = std::sync::mpsc::channel::<u8>();
            let rdata = &data;

            thread::scope(|sc| {
                sc.spawn(move |_| {
                    rdata.iter().for_each(|b| prod.send(*b).unwrap());
                });

                sc.spawn(move |_| {
                    rdata.iter().for_each(|b| {
                        assert_eq!(cons.recv().unwrap(), *b);
                    });
                });
            })
            .unwrap();
        })
    });

    c.bench_function("xbeam channel 256k/4096", |bench| {
        bench.iter(|| {
            let (prod, cons) = crossbeam::channel::bounded::<u8>(4096);
            let rdata = &data;

            thread::scope(|sc| {
                sc.spawn(move |_| {
                    rdata.iter().for_each(|b| prod.send(*b).unwrap());
                });

                sc.spawn(move |_| {
                    rdata.iter().for_each(|b| {
                        assert_eq!(cons.recv().unwrap(), *b);
                    });
                });
            })
            .unwrap();
        })
    });

    c.bench_function("heapless spsc 256k/4096", |bench| {
        bench.iter(|| {
            let mut queue: heapless::spsc::Queue<u8, 4096> = heapless::spsc::Queue::new();
            let (mut prod, mut cons) = queue.split();
            let rdata = &data;

            thread::scope(|sc| {
                sc.spawn(move |_| {
                    rdata.iter().for_each(|b| loop {
                        if prod.enqueue(*b).is_ok() {
                            break;
                        }
                    });
                });

                sc.spawn(move |_| {
                    rdata.iter().for_each(|b| loop {
                        if let Some(got) = cons.dequeue() {
                            assert_eq!(got, *b);
                            break;
                        }
                    });
                });
            })
            .unwrap();
        })
    });
}

use crossbeam_utils::thread;

fn relay<const N: usize>(data: &[u8]) {
    let buf: CharBuffer<N> = CharBuffer::new();
    let (mut prod, mut cons) = buf.try_split().unwrap();
    buf.start();

    thread::scope(|sc| {
        sc.spawn(|_| {
            data.iter().for_each(|b| loop {
                if prod.try_push(*b).is_ok() {
                    break;
                }
            });
        });

        sc.spawn(|_| {
            data.iter().for_each(|b| loop {
                if let Ok(got) = cons.try_pop() {
                    assert_eq!(got, *b);
                    break;
                }
            });
        });
    })
    .unwrap();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
