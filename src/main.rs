use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use rustydsl::prelude::*;
use rustydsl::VERSION;

/// 2チーム・4会員のデモデータを投入する
fn seed(session: &Session) -> Result<()> {
    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    session.persist(&mut team_a)?;
    session.persist(&mut team_b)?;

    for (name, age, team) in [
        ("member1", 10, &team_a),
        ("member2", 20, &team_a),
        ("member3", 30, &team_b),
        ("member4", 40, &team_b),
    ] {
        session.persist(&mut Member::new(name, age, team))?;
    }
    session.flush()?;
    session.clear();
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("RustyDSL version: {}", VERSION);

    let storage = Arc::new(MemoryStorage::new());
    let session = Session::open(Arc::clone(&storage), SessionConfig::from_env())?;
    seed(&session)?;

    let query = session.query_factory();
    let member = QMember::member();
    let team = QTeam::team();

    let found = query
        .select_from(&member)
        .where_(member.username.eq("member1").and(member.age.between(10, 30)))
        .fetch_one()?;
    info!(member = ?found, "search");

    let page = query
        .select_from(&member)
        .order_by(member.username.desc())
        .offset(1)
        .limit(2)
        .fetch_results()?;
    info!(total = page.total(), rows = page.results().len(), "paging");

    let stats = query
        .select((&team.name, &member.age.avg()))
        .from(&member)
        .join(&member.team, &team)
        .group_by(&team.name)
        .fetch()?;
    for row in &stats {
        info!(team = ?row.get(&team.name), average_age = ?row.get(&member.age.avg()), "group by");
    }

    let dtos = query
        .select(Projections::constructor::<MemberDto>((&member.username, &member.age)))
        .from(&member)
        .fetch()?;
    info!(count = dtos.len(), first = ?dtos.first(), "constructor projection");

    let named = session
        .create_query("select m from Member m where m.username = :username")?
        .set_parameter("username", "member3")
        .get_single_result::<Member>()?;
    info!(member = ?named, "text query");

    let repository = MemoryMemberRepository::new(storage);
    let all = repository.find_all().await?;
    info!(members = all.len(), "repository");

    Ok(())
}
