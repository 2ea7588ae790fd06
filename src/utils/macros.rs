/// Runs `$expr` once per capacity in a representative sweep, binding a local
/// type alias `P` to `ConstParams<{ 1 << bits }>` for each iteration.
macro_rules! each_capacity {
  ($expr:expr) => {
    #[cfg(feature = "slow")]
    {
      $crate::utils::each_capacity!(
        @impl $expr,
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
      );
    }

    #[cfg(not(feature = "slow"))]
    {
      $crate::utils::each_capacity!(@impl $expr, 1, 4, 8, 12, 16);
    }
  };
  (@impl $expr:expr, $($bits:expr),+ $(,)?) => {
    $(
      $crate::utils::each_capacity!(@run $expr, $bits);
    )+
  };
  (@run $expr:expr, $bits:expr) => {{
    type P = $crate::params::ConstParams<{ 1 << $bits }>;
    $expr
  }};
}

pub(crate) use each_capacity;
