//! Factor set fixtures

use rankview_common::wire::encode_payload;
use rankview_common::{Channel, Dimensions, FactorSet, PerChannel};

/// width=4, height=2, S=[10, 1], Vt rows of 5s and 1s, `u` row-major 2x2
///
/// With `u = [1, 0, 0, 1]` rank 1 is rows [50, 0] and rank 2 rows [50, 1].
/// With `u = [1, 1, 0, 1]` rank 2 becomes rows [51, 1].
pub fn scenario_sets(u: [f32; 4]) -> PerChannel<FactorSet> {
    let dims = Dimensions::new(4, 2).unwrap();
    PerChannel::from_fn(|_| {
        FactorSet::from_parts(
            u.to_vec(),
            vec![10.0, 1.0],
            vec![5.0, 5.0, 5.0, 5.0, 1.0, 1.0, 1.0, 1.0],
            dims,
        )
    })
}

/// `U` holds the identity in its top r rows and `Vt` is all ones, so row `i`
/// of the rank-k reconstruction is `singular[i]` for `i < k` and 0 after.
pub fn identity_sets(width: usize, height: usize, singular: &[f32]) -> PerChannel<FactorSet> {
    let dims = Dimensions::new(width, height).unwrap();
    let r = dims.full_rank();
    assert_eq!(singular.len(), r, "fixture needs one singular value per component");

    PerChannel::from_fn(|_| {
        let mut u = vec![0.0; dims.u_len()];
        for i in 0..r {
            u[i * r + i] = 1.0;
        }
        FactorSet::from_parts(u, singular.to_vec(), vec![1.0; dims.vt_len()], dims)
    })
}

/// Replace one channel's factor set
pub fn with_channel(mut sets: PerChannel<FactorSet>, channel: Channel, set: FactorSet) -> PerChannel<FactorSet> {
    sets[channel] = set;
    sets
}

pub fn payload_for(sets: &PerChannel<FactorSet>) -> Vec<u8> {
    encode_payload(sets)
}
