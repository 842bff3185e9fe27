//! Personal Source - similar-user candidate pool
//!
//! Every show some other user rated becomes a candidate unless the requesting
//! user already rated it or it is excluded. Each candidate carries one
//! `Contribution` per rater, with that rater's similarity to the requesting
//! user and whether the user follows them, ready for the score aggregator.
//!
//! ## Algorithm
//! 1. Group the corpus by show and by rater (parallel fold/reduce)
//! 2. Keep the shows that are still eligible for the user
//! 3. Collect the raters behind those shows; only they get a similarity
//! 4. Turn every eligible show into a candidate with its contributions

use crate::similarity::{similarity_map, DEFAULT_SIMILARITY};
use crate::types::{Candidate, CandidateSource, Contribution, UserContext};
use data_loader::{Rating, ShowId, UserId};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Display name used when a rater has no profile row
pub fn display_name(user_id: UserId, usernames: &HashMap<UserId, String>) -> String {
    usernames
        .get(&user_id)
        .cloned()
        .unwrap_or_else(|| format!("user{}", user_id))
}

/// Candidate pool over one request-scoped snapshot of the ratings corpus
#[derive(Debug, Clone, Default)]
pub struct PersonalSource {
    /// Ratings per show, in show id order
    ratings_by_show: BTreeMap<ShowId, Vec<Rating>>,
    /// show -> enjoyment per rater, for similarity
    enjoyment_by_rater: HashMap<UserId, HashMap<ShowId, f32>>,
}

impl PersonalSource {
    pub fn new(corpus: Vec<Rating>) -> Self {
        let (ratings_by_show, enjoyment_by_rater) = corpus
            .into_par_iter()
            .fold(
                || (BTreeMap::new(), HashMap::new()),
                |(mut by_show, mut by_rater): (
                    BTreeMap<ShowId, Vec<Rating>>,
                    HashMap<UserId, HashMap<ShowId, f32>>,
                ),
                 rating| {
                    by_rater
                        .entry(rating.user_id)
                        .or_default()
                        .insert(rating.show_id, rating.enjoyment);
                    by_show.entry(rating.show_id).or_default().push(rating);
                    (by_show, by_rater)
                },
            )
            .reduce(
                || (BTreeMap::new(), HashMap::new()),
                |(mut by_show, mut by_rater), (local_shows, local_raters)| {
                    for (show_id, ratings) in local_shows {
                        by_show.entry(show_id).or_default().extend(ratings);
                    }
                    for (user_id, shows) in local_raters {
                        by_rater
                            .entry(user_id)
                            .or_insert_with(HashMap::new)
                            .extend(shows);
                    }
                    (by_show, by_rater)
                },
            );

        Self {
            ratings_by_show,
            enjoyment_by_rater,
        }
    }

    /// Number of shows anyone rated
    pub fn show_count(&self) -> usize {
        self.ratings_by_show.len()
    }

    fn eligible_shows<'a>(
        &'a self,
        context: &'a UserContext,
    ) -> impl Iterator<Item = (&'a ShowId, &'a Vec<Rating>)> + 'a {
        self.ratings_by_show
            .iter()
            .filter(move |(show_id, _)| !context.is_ineligible(**show_id))
    }

    /// Raters (other than the user) behind at least one eligible show
    pub fn candidate_raters(&self, context: &UserContext) -> BTreeSet<UserId> {
        self.eligible_shows(context)
            .flat_map(|(_, ratings)| ratings.iter().map(|r| r.user_id))
            .filter(|&rater| rater != context.user_id)
            .collect()
    }

    /// Similarity of every candidate rater to the user
    pub fn similarities(&self, context: &UserContext) -> HashMap<UserId, f32> {
        let empty = HashMap::new();
        let others: Vec<(UserId, &HashMap<ShowId, f32>)> = self
            .candidate_raters(context)
            .into_iter()
            .map(|rater| (rater, self.enjoyment_by_rater.get(&rater).unwrap_or(&empty)))
            .collect();

        similarity_map(&context.rated_shows, &others)
    }

    /// One candidate per eligible show, in show id order.
    ///
    /// `usernames` labels contributions for explanations; raters missing
    /// from it fall back to [`display_name`].
    #[instrument(skip(self, context, usernames), fields(user_id = context.user_id))]
    pub fn get_candidates(
        &self,
        context: &UserContext,
        usernames: &HashMap<UserId, String>,
    ) -> Vec<Candidate> {
        let similarities = self.similarities(context);
        debug!("Computed similarity for {} raters", similarities.len());

        let eligible: Vec<(&ShowId, &Vec<Rating>)> = self.eligible_shows(context).collect();

        let candidates: Vec<Candidate> = eligible
            .par_iter()
            .filter_map(|&(&show_id, ratings)| {
                let contributions: Vec<Contribution> = ratings
                    .iter()
                    .filter(|r| r.user_id != context.user_id)
                    .map(|r| {
                        let similarity = similarities
                            .get(&r.user_id)
                            .copied()
                            .unwrap_or(DEFAULT_SIMILARITY);
                        Contribution::from_rating(
                            r,
                            display_name(r.user_id, usernames),
                            similarity,
                            context.followees.contains(&r.user_id),
                        )
                    })
                    .collect();

                if contributions.is_empty() {
                    return None;
                }

                let mut candidate =
                    Candidate::new(show_id, CandidateSource::Personal, 0.0);
                candidate.metadata.rater_count = contributions.len() as u32;
                candidate.metadata.positive_count = contributions
                    .iter()
                    .filter(|c| c.recommend == Some(true))
                    .count() as u32;
                candidate.metadata.latest_at = contributions.iter().map(|c| c.created_at).max();
                candidate.contributions = contributions;
                candidate.base_score = candidate.distinct_raters() as f32;
                Some(candidate)
            })
            .collect();

        debug!("Generated {} personal candidates", candidates.len());
        candidates
    }
}
