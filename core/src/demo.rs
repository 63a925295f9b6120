//! Deterministic demo population.
//!
//! Seeds a store with leads and deals that look like a small sales
//! operation: a long tail of one-off buyers, a core of repeat customers,
//! some unattributed deals, a few malformed rows, and non-won noise that
//! the source must filter out. Same seed, same population.

use crate::{
    error::RfvResult,
    rng::DemoRng,
    store::{NewDeal, NewLead, SqliteStore},
};
use chrono::{Duration, NaiveDate};

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Camila", "Diego", "Eduarda", "Felipe", "Gabriela", "Henrique",
    "Isabela", "João", "Larissa", "Marcos", "Natália", "Otávio", "Paula", "Rafael",
    "Sofia", "Thiago", "Vitória", "William",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Barbosa", "Cardoso", "Costa", "Ferreira", "Gomes", "Lima", "Martins",
    "Oliveira", "Pereira", "Ribeiro", "Rocha", "Santos", "Silva", "Souza",
];

const FUNNELS: &[&str] = &["f-inbound", "f-outbound", "f-partners"];
const SELLERS: &[&str] = &["s-01", "s-02", "s-03", "s-04", "s-05"];
const ORIGINS: &[&str] = &["o-site", "o-instagram", "o-referral", "o-events"];

/// Stream indices. Append only: reordering changes every population.
const STREAM_LEADS: u64 = 0;
const STREAM_DEALS: u64 = 1;

#[derive(Debug, Clone, Default)]
pub struct DemoPopulation {
    pub leads: Vec<NewLead>,
    pub deals: Vec<NewDeal>,
}

impl DemoPopulation {
    pub fn won_deals(&self) -> impl Iterator<Item = &NewDeal> {
        self.deals
            .iter()
            .filter(|d| d.status == "won" && !d.archived && d.deleted_at.is_none())
    }
}

/// Generate `customers` leads with their deals, all dated within the
/// 365 days before `anchor`.
pub fn generate(seed: u64, customers: usize, anchor: NaiveDate) -> DemoPopulation {
    let mut lead_rng = DemoRng::new(seed, STREAM_LEADS).with_name("demo_leads");
    let mut deal_rng = DemoRng::new(seed, STREAM_DEALS).with_name("demo_deals");
    let mut population = DemoPopulation::default();
    let mut deal_seq: usize = 0;

    let mut next_deal_id = || {
        deal_seq += 1;
        format!("d-{deal_seq:07}")
    };

    for i in 0..customers {
        let lead_id = format!("l-{i:06}");
        let first = lead_rng.pick(FIRST_NAMES).copied().unwrap_or("Cliente");
        let last = lead_rng.pick(LAST_NAMES).copied().unwrap_or("Demo");
        population.leads.push(NewLead {
            lead_id: lead_id.clone(),
            name: Some(format!("{first} {last}")),
            email: Some(format!("{}.{}{i}@example.com", first.to_lowercase(), last.to_lowercase())),
            ..NewLead::default()
        });

        // 60% one-off buyers, the rest repeat with a heavy tail.
        let purchases = if deal_rng.chance(0.6) {
            1
        } else {
            (deal_rng.pareto(2.0, 1.8) as usize).min(40)
        };
        let ticket = deal_rng.pareto(80.0, 1.6).min(50_000.0);
        let funnel = deal_rng.pick(FUNNELS).map(|s| s.to_string());
        let seller = deal_rng.pick(SELLERS).map(|s| s.to_string());
        let origin = deal_rng.pick(ORIGINS).map(|s| s.to_string());

        for _ in 0..purchases {
            let days_ago = deal_rng.next_u64_below(365) as i64;
            let closed = anchor - Duration::days(days_ago);
            let amount = ticket * (0.5 + deal_rng.next_f64());
            let mut deal = NewDeal::won(
                &next_deal_id(),
                Some(&lead_id),
                &format!("{amount:.2}"),
                &format!("{closed}T{:02}:00:00Z", deal_rng.next_u64_below(24)),
            );
            deal.funnel_id = funnel.clone();
            deal.seller_id = seller.clone();
            deal.origin_id = origin.clone();

            // A sprinkling of bad upstream data.
            if deal_rng.chance(0.01) {
                deal.amount = Some("n/a".to_string());
            }
            if deal_rng.chance(0.01) {
                deal.closed_at = None;
            }
            population.deals.push(deal);
        }

        // Noise the source must exclude.
        if deal_rng.chance(0.2) {
            let mut lost = NewDeal::won(&next_deal_id(), Some(&lead_id), "999.00", &format!("{anchor}T12:00:00Z"));
            lost.status = if deal_rng.chance(0.5) { "lost" } else { "open" }.to_string();
            population.deals.push(lost);
        }
        if deal_rng.chance(0.05) {
            let mut archived = NewDeal::won(&next_deal_id(), Some(&lead_id), "500.00", &format!("{anchor}T12:00:00Z"));
            archived.archived = true;
            population.deals.push(archived);
        }
    }

    // Walk-in sales with no lead attached.
    for _ in 0..(customers / 20) {
        let days_ago = deal_rng.next_u64_below(365) as i64;
        let closed = anchor - Duration::days(days_ago);
        let amount = deal_rng.pareto(40.0, 2.0).min(5_000.0);
        population.deals.push(NewDeal::won(
            &next_deal_id(),
            None,
            &format!("{amount:.2}"),
            &format!("{closed}T10:00:00Z"),
        ));
    }

    population
}

/// Generate and insert a population. Returns it for inspection.
pub fn seed_store(store: &SqliteStore, seed: u64, customers: usize, anchor: NaiveDate) -> RfvResult<DemoPopulation> {
    let population = generate(seed, customers, anchor);
    store.insert_leads(&population.leads)?;
    store.insert_deals(&population.deals)?;
    log::info!(
        "demo: seeded {} lead(s), {} deal(s) (seed={seed}, anchor={anchor})",
        population.leads.len(),
        population.deals.len()
    );
    Ok(population)
}
