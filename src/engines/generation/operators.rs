use crate::engines::generation::genome::{GeneDescriptor, Genome};
use crate::types::Organism;
use rand::Rng;

/// Tournament selection: pick the lowest-fitness of K random candidates
pub fn tournament_selection<'a, R: Rng>(
    population: &'a [Organism],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Organism {
    let mut best_idx = rng.gen_range(0..population.len());
    let mut best_fitness = population[best_idx].rank_fitness();

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        if population[idx].rank_fitness() < best_fitness {
            best_idx = idx;
            best_fitness = population[idx].rank_fitness();
        }
    }

    &population[best_idx]
}

/// Uniform crossover: every key is inherited from either parent
pub fn crossover<R: Rng>(parent1: &Genome, parent2: &Genome, rng: &mut R) -> Genome {
    parent1
        .iter()
        .map(|(key, value)| {
            let inherited = match parent2.get(key) {
                Some(other) if rng.gen_bool(0.5) => *other,
                _ => *value,
            };
            (key.clone(), inherited)
        })
        .collect()
}

/// Bounded-real mutation: each gene moves by up to `mutation_amount` of its
/// range with its descriptor's probability, clamped back into bounds
pub fn mutate<R: Rng>(
    genome: &mut Genome,
    descriptors: &[GeneDescriptor],
    mutation_amount: f64,
    rng: &mut R,
) {
    for d in descriptors {
        if let Some(value) = genome.get_mut(&d.key) {
            if rng.gen::<f64>() < d.mutation_rate {
                let step = (rng.gen::<f64>() - 0.5) * (d.upper - d.lower) * mutation_amount;
                *value = (*value + step).clamp(d.lower, d.upper);
            }
        }
    }
}

/// Generate a genome uniformly inside the descriptor bounds
pub fn random_genome<R: Rng>(descriptors: &[GeneDescriptor], rng: &mut R) -> Genome {
    descriptors
        .iter()
        .map(|d| {
            let value = if d.upper > d.lower {
                rng.gen_range(d.lower..=d.upper)
            } else {
                d.lower
            };
            (d.key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FitnessSlot;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn descriptor(key: &str, lower: f64, upper: f64) -> GeneDescriptor {
        GeneDescriptor {
            key: key.to_string(),
            lower,
            upper,
            mutation_rate: 1.0,
        }
    }

    #[test]
    fn test_mutation_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let descs = vec![descriptor("a:x", 0.0, 1.0), descriptor("a:y", -5.0, 5.0)];
        let mut genome = random_genome(&descs, &mut rng);
        for _ in 0..500 {
            mutate(&mut genome, &descs, 0.5, &mut rng);
            assert!((0.0..=1.0).contains(&genome["a:x"]));
            assert!((-5.0..=5.0).contains(&genome["a:y"]));
        }
    }

    #[test]
    fn test_crossover_inherits_from_parents() {
        let mut rng = StdRng::seed_from_u64(1);
        let p1: Genome = [("k:a".to_string(), 1.0), ("k:b".to_string(), 2.0)].into();
        let p2: Genome = [("k:a".to_string(), 10.0), ("k:b".to_string(), 20.0)].into();
        let child = crossover(&p1, &p2, &mut rng);
        assert_eq!(child.len(), 2);
        assert!(child["k:a"] == 1.0 || child["k:a"] == 10.0);
        assert!(child["k:b"] == 2.0 || child["k:b"] == 20.0);
    }

    #[test]
    fn test_tournament_prefers_lower_fitness() {
        let mut rng = StdRng::seed_from_u64(3);
        let population: Vec<Organism> = (0..4)
            .map(|i| Organism {
                genome: [("k:a".to_string(), i as f64)].into(),
                fitness: FitnessSlot::Resolved(i as f64),
            })
            .collect();
        // A tournament as large as the population almost surely sees index 0
        let winner = tournament_selection(&population, 64, &mut rng);
        assert_eq!(winner.fitness, FitnessSlot::Resolved(0.0));
    }
}
