use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::models::{ObservationRecord, Term, Tier};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let fellows = vec![
        (
            Uuid::parse_str("7b1c3a9e-52d8-4f10-9a6e-2b87c4f0d1a3")?,
            "Thandi Nkosi",
            "thandi.nkosi@fellowship.org",
            "Year 1",
        ),
        (
            Uuid::parse_str("4e92d7c1-8a05-4b36-b1f2-90ce53a7e8b4")?,
            "Sipho Dlamini",
            "sipho.dlamini@fellowship.org",
            "Year 1",
        ),
        (
            Uuid::parse_str("c8f04b2d-61e9-47a3-85d0-1f3ba9c6e725")?,
            "Lerato Mokoena",
            "lerato.mokoena@fellowship.org",
            "Year 2",
        ),
        (
            Uuid::parse_str("2a6d91f5-3c48-4e07-bc19-d84e07f5a216")?,
            "Naledi Khumalo",
            "naledi.khumalo@fellowship.org",
            "Year 2",
        ),
    ];

    for (id, name, email, fellowship_year) in fellows {
        sqlx::query(
            r#"
            INSERT INTO tier_progression.fellows (id, full_name, email, fellowship_year)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, fellowship_year = EXCLUDED.fellowship_year
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(fellowship_year)
        .fetch_one(pool)
        .await?;
    }

    let observations = vec![
        // LE dips in Term 2 and recovers in Term 3.
        ("seed-001", "thandi.nkosi@fellowship.org", "Term 1", "LE", 3, 3.4, "Primary School", (2026, 2, 10)),
        ("seed-002", "sipho.dlamini@fellowship.org", "Term 1", "LE", 1, 1.6, "High School", (2026, 2, 11)),
        ("seed-003", "lerato.mokoena@fellowship.org", "Term 1", "LE", 2, 2.3, "Primary School", (2026, 2, 12)),
        ("seed-004", "thandi.nkosi@fellowship.org", "Term 2", "LE", 1, 1.8, "Primary School", (2026, 5, 12)),
        ("seed-005", "sipho.dlamini@fellowship.org", "Term 2", "LE", 1, 1.4, "High School", (2026, 5, 13)),
        ("seed-006", "lerato.mokoena@fellowship.org", "Term 2", "LE", 2, 2.5, "Primary School", (2026, 5, 14)),
        ("seed-007", "thandi.nkosi@fellowship.org", "Term 3", "LE", 3, 3.6, "Primary School", (2026, 8, 18)),
        ("seed-008", "sipho.dlamini@fellowship.org", "Term 3", "LE", 3, 3.2, "High School", (2026, 8, 19)),
        ("seed-009", "lerato.mokoena@fellowship.org", "Term 3", "LE", 2, 2.7, "Primary School", (2026, 8, 20)),
        // SE grows term over term.
        ("seed-010", "naledi.khumalo@fellowship.org", "Term 1", "SE", 1, 1.5, "High School", (2026, 2, 17)),
        ("seed-011", "thandi.nkosi@fellowship.org", "Term 1", "SE", 2, 2.2, "Primary School", (2026, 2, 18)),
        ("seed-012", "naledi.khumalo@fellowship.org", "Term 2", "SE", 2, 2.4, "High School", (2026, 5, 19)),
        ("seed-013", "thandi.nkosi@fellowship.org", "Term 2", "SE", 3, 3.1, "Primary School", (2026, 5, 20)),
        ("seed-014", "naledi.khumalo@fellowship.org", "Term 3", "SE", 3, 3.3, "High School", (2026, 8, 24)),
        ("seed-015", "thandi.nkosi@fellowship.org", "Term 3", "SE", 3, 3.5, "Primary School", (2026, 8, 25)),
        // KPC stays bottom-heavy.
        ("seed-016", "sipho.dlamini@fellowship.org", "Term 1", "KPC", 1, 1.3, "High School", (2026, 2, 24)),
        ("seed-017", "lerato.mokoena@fellowship.org", "Term 2", "KPC", 1, 1.7, "Primary School", (2026, 5, 26)),
        ("seed-018", "sipho.dlamini@fellowship.org", "Term 3", "KPC", 2, 2.1, "High School", (2026, 8, 27)),
    ];

    for (source_key, email, term, domain, tier, score, school_level, (year, month, day)) in
        observations
    {
        let observed_at = NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?;
        let fellow_id: Uuid =
            sqlx::query("SELECT id FROM tier_progression.fellows WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO tier_progression.observations
            (id, fellow_id, term, domain, tier, score, school_level, observed_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fellow_id)
        .bind(term)
        .bind(domain)
        .bind(tier)
        .bind(score)
        .bind(school_level)
        .bind(observed_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_observations(
    pool: &PgPool,
    term: Option<Term>,
    domain: Option<&str>,
    school_level: Option<&str>,
    fellowship_year: Option<&str>,
) -> anyhow::Result<Vec<ObservationRecord>> {
    let mut query = String::from(
        "SELECT f.id AS fellow_id, f.full_name, f.fellowship_year, \
         o.term, o.domain, o.tier, o.score, o.school_level, o.observed_at \
         FROM tier_progression.observations o \
         JOIN tier_progression.fellows f ON f.id = o.fellow_id",
    );

    let term_label = term.map(|t| t.to_string());
    let mut clauses: Vec<String> = Vec::new();
    if term_label.is_some() {
        clauses.push(format!("o.term = ${}", clauses.len() + 1));
    }
    if domain.is_some() {
        clauses.push(format!("o.domain = ${}", clauses.len() + 1));
    }
    if school_level.is_some() {
        clauses.push(format!("o.school_level = ${}", clauses.len() + 1));
    }
    if fellowship_year.is_some() {
        clauses.push(format!("f.fellowship_year = ${}", clauses.len() + 1));
    }
    if !clauses.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&clauses.join(" AND "));
    }
    query.push_str(" ORDER BY o.observed_at, o.domain");

    let mut rows = sqlx::query(&query);
    if let Some(value) = &term_label {
        rows = rows.bind(value);
    }
    if let Some(value) = domain {
        rows = rows.bind(value);
    }
    if let Some(value) = school_level {
        rows = rows.bind(value);
    }
    if let Some(value) = fellowship_year {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut observations = Vec::new();

    for row in records {
        let term_text: String = row.get("term");
        let term = term_text
            .parse::<Term>()
            .with_context(|| format!("stored term {term_text:?} is not recognized"))?;

        let tier_level: i32 = row.get("tier");
        let tier = Tier::from_level(tier_level)
            .with_context(|| format!("stored tier {tier_level} is out of range"))?;

        observations.push(ObservationRecord {
            fellow_id: row.get("fellow_id"),
            fellow_name: row.get("full_name"),
            term,
            domain: row.get("domain"),
            tier,
            score: row.get("score"),
            school_level: row.get("school_level"),
            fellowship_year: Some(row.get("fellowship_year")),
            observed_at: row.get("observed_at"),
        });
    }

    debug!(rows = observations.len(), "fetched observations");
    Ok(observations)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        fellowship_year: String,
        school_level: Option<String>,
        term: String,
        domain: String,
        tier: String,
        score: f64,
        observed_at: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let term = row
            .term
            .parse::<Term>()
            .with_context(|| format!("row for {}: bad term {:?}", row.email, row.term))?;
        let tier = row
            .tier
            .parse::<Tier>()
            .with_context(|| format!("row for {}: bad tier {:?}", row.email, row.tier))?;

        let fellow_id: Uuid = sqlx::query(
            r#"
            INSERT INTO tier_progression.fellows
            (id, full_name, email, fellowship_year)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, fellowship_year = EXCLUDED.fellowship_year
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .bind(&row.fellowship_year)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO tier_progression.observations
            (id, fellow_id, term, domain, tier, score, school_level, observed_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fellow_id)
        .bind(term.to_string())
        .bind(&row.domain)
        .bind(tier.level())
        .bind(row.score)
        .bind(&row.school_level)
        .bind(row.observed_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    debug!(inserted, "csv import complete");
    Ok(inserted)
}
