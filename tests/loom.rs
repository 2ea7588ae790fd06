#![cfg(loom)]

use std::sync::Arc;

use loom::thread;
use sdd::Guard;

use bucketq::Bucket;
use bucketq::ConstParams;
use bucketq::Deque;
use bucketq::FixedSizeDeque;
use bucketq::FixedSizeHashBucket;

type Small = ConstParams<2>;

/// Two threads race to insert into the same slot: exactly one should win.
#[test]
fn racing_slot_insert() {
  loom::model(|| {
    let bucket: Arc<Bucket<u32, Small>> = Arc::new(Bucket::new());

    let a = {
      let bucket = Arc::clone(&bucket);
      thread::spawn(move || {
        let guard = Guard::new();
        bucket.insert(0, &guard, 1).is_ok()
      })
    };

    let b = {
      let bucket = Arc::clone(&bucket);
      thread::spawn(move || {
        let guard = Guard::new();
        bucket.insert(0, &guard, 2).is_ok()
      })
    };

    let a_won = a.join().unwrap();
    let b_won = b.join().unwrap();

    assert_ne!(a_won, b_won, "exactly one insert should win the race");
    assert_eq!(bucket.count(), 1);
  });
}

/// Two threads race to add the same key: one sees `Inserted`, the other sees
/// `Duplicate`. Neither should ever see `Collision` since the keys match.
#[test]
fn racing_hash_bucket_add_same_key() {
  loom::model(|| {
    let table: Arc<FixedSizeHashBucket<u64, u32, Small>> = Arc::new(FixedSizeHashBucket::new());

    let a = {
      let table = Arc::clone(&table);
      thread::spawn(move || {
        let guard = Guard::new();
        table.add(7, 1, 7, 0, &guard)
      })
    };

    let b = {
      let table = Arc::clone(&table);
      thread::spawn(move || {
        let guard = Guard::new();
        table.add(7, 2, 7, 0, &guard)
      })
    };

    let a_result = a.join().unwrap();
    let b_result = b.join().unwrap();

    let inserted = matches!(a_result, bucketq::AddOutcome::Inserted(_)) as u8 + matches!(b_result, bucketq::AddOutcome::Inserted(_)) as u8;
    let duplicate = matches!(a_result, bucketq::AddOutcome::Duplicate) as u8 + matches!(b_result, bucketq::AddOutcome::Duplicate) as u8;

    assert_eq!(inserted, 1, "exactly one add should insert");
    assert_eq!(duplicate, 1, "the other add should observe a duplicate key");
    assert_eq!(table.count(), 1);
  });
}

/// One thread pushes onto the front while another pops from the back; the
/// value must come out exactly once.
#[test]
fn fixed_deque_front_pusher_back_taker() {
  loom::model(|| {
    let deque: Arc<FixedSizeDeque<u32, Small>> = Arc::new(FixedSizeDeque::new());
    deque.add_back(0, &Guard::new());

    let pusher = {
      let deque = Arc::clone(&deque);
      thread::spawn(move || deque.add_front(1, &Guard::new()))
    };

    let taker = {
      let deque = Arc::clone(&deque);
      thread::spawn(move || {
        let mut taken = Vec::new();

        for _ in 0..2 {
          if let Some(value) = deque.try_take_back(&Guard::new()) {
            taken.push(value);
          }
        }

        taken
      })
    };

    let pushed = pusher.join().unwrap();
    let mut taken = taker.join().unwrap();

    while let Some(value) = deque.try_take_front(&Guard::new()) {
      taken.push(value);
    }

    while let Some(value) = deque.try_take_back(&Guard::new()) {
      taken.push(value);
    }

    taken.sort_unstable();

    let mut expected = vec![0];

    if pushed {
      expected.push(1);
    }

    expected.sort_unstable();
    assert_eq!(taken, expected);
  });
}

/// A resize racing with concurrent adds/takes must never lose or duplicate a
/// value: every successful add is eventually observed by exactly one take.
#[test]
fn deque_resize_races_with_add_and_take() {
  loom::model(|| {
    let deque: Arc<Deque<u32>> = Arc::new(Deque::with_capacity(2));

    let adder = {
      let deque = Arc::clone(&deque);
      thread::spawn(move || {
        deque.add_back(1);
        deque.add_back(2);
      })
    };

    let taker = {
      let deque = Arc::clone(&deque);
      thread::spawn(move || deque.try_take_front())
    };

    adder.join().unwrap();
    let taken_during = taker.join().unwrap();

    let mut remaining = Vec::new();
    while let Some(value) = deque.try_take_back() {
      remaining.push(value);
    }

    let mut observed: Vec<u32> = taken_during.into_iter().collect();
    observed.extend(remaining);
    observed.sort_unstable();

    assert_eq!(observed, vec![1, 2]);
  });
}
