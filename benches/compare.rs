use std::collections::VecDeque;
use std::sync::Mutex;

use bucketq::Deque;
use divan::Bencher;
use divan::bench;
use divan::bench_group;
use divan::black_box;

const OPS: &[usize] = &[1 << 4, 1 << 6, 1 << 8, 1 << 10, 1 << 12, 1 << 14];

const THREADS: &[usize] = &[0, 1, 4, 8, 16];

// -----------------------------------------------------------------------------
// Unify APIs for Simplicity
// -----------------------------------------------------------------------------

trait Double<T>: Sized + Send + Sync + 'static
where
  T: Send + Sync + 'static,
{
  fn new() -> Self;

  fn push_back(&self, value: T);

  fn pop_front(&self) -> Option<T>;
}

impl<T> Double<T> for Deque<T>
where
  T: Send + Sync + 'static,
{
  fn new() -> Self {
    Deque::new()
  }

  fn push_back(&self, value: T) {
    self.add_back(value);
  }

  fn pop_front(&self) -> Option<T> {
    self.try_take_front()
  }
}

impl<T> Double<T> for Mutex<VecDeque<T>>
where
  T: Send + Sync + 'static,
{
  fn new() -> Self {
    Mutex::new(VecDeque::new())
  }

  fn push_back(&self, value: T) {
    self.lock().unwrap().push_back(value);
  }

  fn pop_front(&self) -> Option<T> {
    self.lock().unwrap().pop_front()
  }
}

// -----------------------------------------------------------------------------
// Actual Benchmarks
// -----------------------------------------------------------------------------

#[bench_group(name = "PushBack", skip_ext_time, threads = THREADS)]
mod push_back {
  use super::bench;
  use super::*;

  fn bench<T>(bencher: Bencher<'_, '_>, ops: usize)
  where
    T: Double<usize>,
  {
    bencher.counter(ops).with_inputs(<T as Double<usize>>::new).bench_local_refs(move |this: &mut T| {
      for index in 0..ops {
        this.push_back(black_box(index));
      }
    });
  }

  #[bench(args = OPS)]
  fn bench_deque(bencher: Bencher<'_, '_>, ops: usize) {
    bench::<Deque<usize>>(bencher, ops);
  }

  #[bench(args = OPS)]
  fn bench_mutex(bencher: Bencher<'_, '_>, ops: usize) {
    bench::<Mutex<VecDeque<usize>>>(bencher, ops);
  }
}

#[bench_group(name = "Churn", skip_ext_time, threads = THREADS)]
mod churn {
  use super::bench;
  use super::*;

  fn bench<T>(bencher: Bencher<'_, '_>, ops: usize)
  where
    T: Double<usize>,
  {
    bencher
      .counter(ops)
      .with_inputs(|| {
        let this = <T as Double<usize>>::new();
        this.push_back(0);
        this
      })
      .bench_local_refs(move |this: &mut T| {
        for index in 0..ops {
          this.push_back(black_box(index));
          _ = black_box(this.pop_front());
        }
      });
  }

  #[bench(args = OPS)]
  fn bench_deque(bencher: Bencher<'_, '_>, ops: usize) {
    bench::<Deque<usize>>(bencher, ops);
  }

  #[bench(args = OPS)]
  fn bench_mutex(bencher: Bencher<'_, '_>, ops: usize) {
    bench::<Mutex<VecDeque<usize>>>(bencher, ops);
  }
}

#[bench_group(name = "GrowFromEmpty", skip_ext_time)]
mod grow_from_empty {
  use super::bench;
  use super::*;

  fn bench<T>(bencher: Bencher<'_, '_>, ops: usize)
  where
    T: Double<usize>,
  {
    bencher.counter(ops).with_inputs(<T as Double<usize>>::new).bench_local_refs(move |this: &mut T| {
      for index in 0..ops {
        this.push_back(black_box(index));
      }

      while this.pop_front().is_some() {}
    });
  }

  #[bench(args = OPS)]
  fn bench_deque(bencher: Bencher<'_, '_>, ops: usize) {
    bench::<Deque<usize>>(bencher, ops);
  }

  #[bench(args = OPS)]
  fn bench_mutex(bencher: Bencher<'_, '_>, ops: usize) {
    bench::<Mutex<VecDeque<usize>>>(bencher, ops);
  }
}

// -----------------------------------------------------------------------------
// Main
// -----------------------------------------------------------------------------

fn main() {
  divan::main();
}
