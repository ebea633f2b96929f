use vasari_core::{CostRecord, ModelPricing, Usage, compute_cost};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn cost_is_linear_in_token_counts() {
    let pricing = ModelPricing::new(0.001, 0.002);
    let single = compute_cost(&Usage::new(10, 1), &pricing);
    let doubled = compute_cost(&Usage::new(20, 2), &pricing);

    assert!(approx(*doubled.prompt_cost(), 2.0 * single.prompt_cost()));
    assert!(approx(*doubled.completion_cost(), 2.0 * single.completion_cost()));
    assert!(approx(*doubled.total_cost(), 2.0 * single.total_cost()));
}

#[test]
fn total_is_sum_of_parts() {
    let cost = compute_cost(&Usage::new(1234, 567), &ModelPricing::new(0.0000025, 0.000015));
    assert!(approx(
        *cost.total_cost(),
        cost.prompt_cost() + cost.completion_cost()
    ));
}

#[test]
fn zero_usage_costs_nothing() {
    let cost = compute_cost(&Usage::default(), &ModelPricing::new(0.5, 0.5));
    assert_eq!(*cost.total_cost(), 0.0);
}

#[test]
fn per_thousand_pricing_matches_list_price() {
    // gpt-4 list price: $0.03 / $0.06 per 1K tokens
    let pricing = ModelPricing::per_thousand(0.03, 0.06);
    let cost = compute_cost(&Usage::new(1000, 1000), &pricing);
    assert!(approx(*cost.prompt_cost(), 0.03));
    assert!(approx(*cost.completion_cost(), 0.06));
}

#[test]
fn record_carries_source_summary() {
    let record = CostRecord::new(
        "openai/gpt-4o",
        Some("OpenAI".to_string()),
        Some("gen-123".to_string()),
        Usage::new(10, 1),
        &ModelPricing::new(0.001, 0.002),
    );
    assert_eq!(record.model(), "openai/gpt-4o");
    assert_eq!(record.provider().as_deref(), Some("OpenAI"));
    assert!(approx(record.total_cost(), 0.012));
    assert_eq!(record.usage().total(), 11);
}
