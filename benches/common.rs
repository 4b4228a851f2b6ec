use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// A random DNA sequence of the given length, seeded for reproducible
/// benchmark runs across invocations.
pub fn random_dna(len: usize) -> Vec<u8> {
    let mut rng: StdRng = SeedableRng::from_seed([0; 32]);
    (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect()
}
