//! Proptest generators for property-based testing.

use proptest::prelude::*;

use knishio_core::{Atom, Isotope, MetaItem};

use crate::fixtures::FIXED_CREATED_AT;

/// Generate a base17 molecular hash.
pub fn base17_hash() -> impl Strategy<Value = String> {
    "[0-9a-g]{64}".prop_map(String::from)
}

/// Generate a 64-character hex position.
pub fn position() -> impl Strategy<Value = String> {
    "[0-9a-f]{64}".prop_map(String::from)
}

/// Generate a token slug.
pub fn token() -> impl Strategy<Value = String> {
    "[A-Z]{3,6}".prop_map(String::from)
}

/// Generate an isotope.
pub fn isotope() -> impl Strategy<Value = Isotope> {
    prop::sample::select(Isotope::ALL.to_vec())
}

/// Generate meta pairs, some with null values.
pub fn meta(max_len: usize) -> impl Strategy<Value = Vec<MetaItem>> {
    prop::collection::vec(
        ("[a-z]{1,8}", prop::option::of("[ -~]{0,16}")),
        0..=max_len,
    )
    .prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(key, value)| MetaItem { key, value })
            .collect()
    })
}

/// Parameters for generating an atom.
#[derive(Debug, Clone)]
pub struct AtomParams {
    pub isotope: Isotope,
    pub position: String,
    pub address: String,
    pub token: String,
    pub value: Option<i64>,
    pub meta_type: Option<String>,
    pub meta_id: Option<String>,
    pub meta: Vec<MetaItem>,
}

impl Arbitrary for AtomParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            isotope(),
            position(),
            position(),
            token(),
            prop::option::of(-1_000_000i64..=1_000_000i64),
            prop::option::of("[a-z]{1,12}"),
            prop::option::of("[a-z0-9]{1,12}"),
            meta(4),
        )
            .prop_map(
                |(isotope, position, address, token, value, meta_type, meta_id, meta)| {
                    AtomParams {
                        isotope,
                        position,
                        address,
                        token,
                        value,
                        meta_type,
                        meta_id,
                        meta,
                    }
                },
            )
            .boxed()
    }
}

/// Build an atom at `index` from parameters.
pub fn atom_from_params(params: &AtomParams, index: usize) -> Atom {
    let mut builder = Atom::builder(params.isotope)
        .position(&params.position)
        .wallet_address(&params.address)
        .token(&params.token)
        .meta(params.meta.clone())
        .index(index)
        .created_at(FIXED_CREATED_AT);
    if let Some(value) = params.value {
        builder = builder.value(value as f64);
    }
    if let Some(meta_type) = &params.meta_type {
        builder = builder.meta_type(meta_type);
    }
    if let Some(meta_id) = &params.meta_id {
        builder = builder.meta_id(meta_id);
    }
    builder.build()
}

/// Generate between one and `max_len` atoms with indices `0..n`.
pub fn atoms(max_len: usize) -> impl Strategy<Value = Vec<Atom>> {
    prop::collection::vec(any::<AtomParams>(), 1..=max_len).prop_map(|params| {
        params
            .iter()
            .enumerate()
            .map(|(i, p)| atom_from_params(p, i))
            .collect()
    })
}
