use std::sync::Arc;

use rustydsl::prelude::*;

/// teamA に member1(10), member2(20)、teamB に member3(30), member4(40)
///
/// 挿入は予約されるだけで、最初のクエリの前に自動で書き出される。
pub fn fixture() -> Session {
    let session = Session::open(Arc::new(MemoryStorage::new()), SessionConfig::default())
        .expect("open session");

    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    session.persist(&mut team_a).expect("persist teamA");
    session.persist(&mut team_b).expect("persist teamB");

    for (name, age, team) in [
        ("member1", 10, &team_a),
        ("member2", 20, &team_a),
        ("member3", 30, &team_b),
        ("member4", 40, &team_b),
    ] {
        session
            .persist(&mut Member::new(name, age, team))
            .expect("persist member");
    }
    session
}

/// チームに所属しない会員を追加する
#[allow(dead_code)]
pub fn add_member(session: &Session, username: Option<&str>, age: i32) {
    session
        .persist(&mut Member::without_team(username, age))
        .expect("persist member without team");
}

#[allow(dead_code)]
pub fn usernames(members: &[Member]) -> Vec<Option<&str>> {
    members.iter().map(|member| member.username.as_deref()).collect()
}
