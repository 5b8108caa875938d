//! Transforms consecutive raw counter samples into validated `base_rates`
//! bins (§4.4 "Rate Deriver").

use common_types::{slot::slot, FreqMs, RateBin, RawSample, Series, TimestampMs};
use logger::debug;
use snafu::ResultExt;
use store_kv::StoreAdapter;
use time_ext::year_of_millis;

use crate::{
    aggregator::Aggregator,
    config::Config,
    error::{Result, StoreSnafu},
    metadata::{Metadata, MetadataCache},
};

/// Consumes one raw sample end-to-end: persists it, derives (or rejects) a
/// rate delta against the series' metadata, and fans valid deltas out to
/// the aggregator (§4.4 steps 1-6).
pub async fn derive(
    store: &dyn StoreAdapter,
    metadata: &MetadataCache,
    aggregator: &Aggregator,
    config: &Config,
    sample: &RawSample,
) -> Result<()> {
    let series = Series::new(sample.path.clone(), sample.freq);

    // Step 1: persist the raw sample unconditionally. A bare integer is
    // already a valid JSON scalar, so no encoding can fail here.
    let raw_key = sample.path.raw_row_key(year_of_millis(sample.ts));
    store
        .insert_raw(&raw_key, sample.ts, &sample.val.to_string(), None)
        .await
        .context(StoreSnafu { op: "insert_raw" })?;

    // Step 2: load (or cold-seed) the series' metadata record.
    let prior = metadata.get_or_load(store, &series, sample.ts, sample.val, sample.ts).await?;

    // Step 3: compute the deltas.
    let delta_t = sample.ts - prior.last_update;
    let delta_v = sample.val - prior.last_val;

    // Step 4: classify.
    if delta_t <= 0 {
        debug!(
            "dropping out-of-order/duplicate sample, path:{:?}, ts:{}, last_update:{}",
            sample.path.segments(),
            sample.ts,
            prior.last_update
        );
        return Ok(());
    }

    let sanity_bound = config.delta_sanity_factor as i64 * sample.freq as i64;
    let is_valid = delta_v >= 0 && delta_t <= sanity_bound;

    if is_valid {
        // Step 4 (valid) + bin straddling: split the delta proportionally
        // across every base-rate slot the [last_update, ts) interval spans.
        for (bin_ts, share) in split_bins(prior.last_update, sample.ts, delta_v, sample.freq) {
            let key = series.row_key(year_of_millis(bin_ts));
            let (val_delta, valid_delta) = RateBin::valid_increment(share);
            store
                .increment_rate(&key, bin_ts, val_delta, valid_delta)
                .await
                .context(StoreSnafu { op: "increment_rate" })?;

            // Step 5: fan out to every coarser rollup frequency.
            fan_out(store, aggregator, config, &series, bin_ts, share).await?;
        }
    } else {
        debug!(
            "counter reset/wrap/outlier, path:{:?}, delta_t:{}, delta_v:{}",
            sample.path.segments(),
            delta_t,
            delta_v
        );
        let bin_ts = slot(sample.ts, sample.freq);
        let key = series.row_key(year_of_millis(bin_ts));
        let (val_delta, valid_delta) = RateBin::invalid_increment();
        store
            .increment_rate(&key, bin_ts, val_delta, valid_delta)
            .await
            .context(StoreSnafu { op: "increment_rate (invalid)" })?;
    }

    // Step 6: update the metadata record with the new sample, valid or not
    // — the next delta is always computed against whatever was just seen.
    metadata
        .update(
            &series,
            Metadata { last_val: sample.val, last_update: sample.ts, min_ts: prior.min_ts.min(sample.ts) },
        )
        .await;

    Ok(())
}

async fn fan_out(
    store: &dyn StoreAdapter,
    aggregator: &Aggregator,
    config: &Config,
    series: &Series,
    bin_ts: TimestampMs,
    share: i64,
) -> Result<()> {
    for &coarser_freq in &config.coarser_freqs_ms {
        if coarser_freq > series.freq && coarser_freq % series.freq == 0 {
            let coarser_series = Series::new(series.path.clone(), coarser_freq);
            aggregator.fan_out(store, &coarser_series, bin_ts, share, series.freq).await?;
        }
    }
    Ok(())
}

/// Splits `delta_val` across the base-rate slots that `(last_update, ts]`
/// spans, proportionally by the fraction of the elapsed time falling in
/// each slot (§4.4 "Bin straddling"). `last_update`'s own slot never
/// receives a share — only slots entered after it did, up to and including
/// `ts`'s slot — since that prior slot was already credited by earlier
/// samples. The final slot absorbs any rounding remainder so the emitted
/// shares always sum to exactly `delta_val`.
fn split_bins(start: TimestampMs, end: TimestampMs, delta_val: i64, freq: FreqMs) -> Vec<(TimestampMs, i64)> {
    let freq_i = freq as i64;
    let start_slot = slot(start, freq);
    let end_slot = slot(end, freq);

    if start_slot == end_slot {
        return vec![(end_slot, delta_val)];
    }

    let total_dt = (end - start) as f64;
    let mut bins = Vec::new();
    let mut assigned = 0i64;
    let mut s = start_slot + freq_i;
    while s <= end_slot {
        let bin_start = s.max(start);
        let bin_end = (s + freq_i).min(end);
        let share = if s == end_slot {
            delta_val - assigned
        } else {
            let overlap = (bin_end - bin_start) as f64;
            let v = (delta_val as f64 * overlap / total_dt).round() as i64;
            assigned += v;
            v
        };
        bins.push((s, share));
        s += freq_i;
    }
    bins
}
