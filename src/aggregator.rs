use crate::{
    models::{Draw, DrawListing, DrawnNumber, Prize},
    repository::{RepoResult, Repository},
};
use std::collections::HashMap;

/// load_listing
///
/// Fetches draws, numbers and prizes one after the other and composes the admin
/// listing. The first failing fetch aborts the whole listing.
pub async fn load_listing(repo: &dyn Repository) -> RepoResult<Vec<DrawListing>> {
    let draws = repo.list_draws().await?;
    let numbers = repo.list_numbers().await?;
    let prizes = repo.list_prizes().await?;
    Ok(aggregate(draws, numbers, prizes))
}

/// aggregate
///
/// Attaches to every draw the numbers and prizes that reference it, as a
/// hash-join: one pass buckets the children by `draw_id`, a second pass walks
/// the draws. Draw order and the order of each bucket follow the inputs.
/// Children whose draw is not in `draws` are dropped.
pub fn aggregate(
    draws: Vec<Draw>,
    numbers: Vec<DrawnNumber>,
    prizes: Vec<Prize>,
) -> Vec<DrawListing> {
    let mut buckets: HashMap<i32, (Vec<DrawnNumber>, Vec<Prize>)> =
        draws.iter().map(|d| (d.id, (Vec::new(), Vec::new()))).collect();

    for number in numbers {
        if let Some((bucket, _)) = buckets.get_mut(&number.draw_id) {
            bucket.push(number);
        }
    }
    for prize in prizes {
        if let Some((_, bucket)) = buckets.get_mut(&prize.draw_id) {
            bucket.push(prize);
        }
    }

    draws
        .into_iter()
        .map(|draw| {
            // Duplicate draw ids share one bucket; the first occurrence takes it.
            let (numbers, prizes) = buckets.remove(&draw.id).unwrap_or_default();
            DrawListing {
                draw,
                numbers,
                prizes,
            }
        })
        .collect()
}
