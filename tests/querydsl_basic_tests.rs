mod common;

use proptest::prelude::*;
use test_case::test_case;

use common::{add_member, fixture, usernames};
use rustydsl::domain::query::expressions::select;
use rustydsl::prelude::*;

#[test]
fn start_text_query() {
    let session = fixture();
    let found = session
        .create_query("select m from Member m where m.username = :username")
        .unwrap()
        .set_parameter("username", "member1")
        .get_single_result::<Member>()
        .unwrap()
        .unwrap();
    assert_eq!(found.username.as_deref(), Some("member1"));
}

#[test]
fn start_typed_query() {
    let session = fixture();
    let member = QMember::member();
    let found = session
        .query_factory()
        .select(&member)
        .from(&member)
        .where_(member.username.eq("member1"))
        .fetch_one()
        .unwrap()
        .unwrap();
    assert_eq!(found.username.as_deref(), Some("member1"));
}

#[test]
fn search_with_and() {
    let session = fixture();
    let member = QMember::member();
    let found = session
        .query_factory()
        .select_from(&member)
        .where_(member.username.eq("member1").and(member.age.eq(10)))
        .fetch_one()
        .unwrap();
    assert_eq!(found.and_then(|m| m.username).as_deref(), Some("member1"));
}

#[test]
fn search_with_multiple_conditions() {
    let session = fixture();
    let member = QMember::member();
    let found = session
        .query_factory()
        .select_from(&member)
        .where_((member.username.eq("member1"), member.age.eq(10)))
        .fetch_one()
        .unwrap();
    assert_eq!(found.map(|m| m.age), Some(10));

    // None は読み飛ばされる
    let age_filter: Option<Predicate> = None;
    let found = session
        .query_factory()
        .select_from(&member)
        .where_((Some(member.username.eq("member2")), age_filter))
        .fetch()
        .unwrap();
    assert_eq!(usernames(&found), vec![Some("member2")]);
}

#[test]
fn result_fetch_variants() {
    let session = fixture();
    let member = QMember::member();
    let query = session.query_factory();

    assert_eq!(query.select_from(&member).fetch().unwrap().len(), 4);

    let error = query.select_from(&member).fetch_one().unwrap_err();
    assert!(matches!(error, Error::TooManyResults(4)));
    assert!(!error.is_build_error());

    let first = query.select_from(&member).fetch_first().unwrap();
    assert_eq!(first.and_then(|m| m.username).as_deref(), Some("member1"));

    let results = query.select_from(&member).fetch_results().unwrap();
    assert_eq!(results.total(), 4);
    assert_eq!(results.results().len(), 4);

    assert_eq!(query.select_from(&member).fetch_count().unwrap(), 4);
}

#[test]
fn fetch_one_without_match_is_none() {
    let session = fixture();
    let member = QMember::member();
    let found = session
        .query_factory()
        .select_from(&member)
        .where_(member.username.eq("nobody"))
        .fetch_one()
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn count_entity_identifier() {
    let session = fixture();
    let member = QMember::member();
    let total = session
        .query_factory()
        .select(member.count())
        .from(&member)
        .fetch_one()
        .unwrap();
    assert_eq!(total, Some(Some(4)));
}

#[test]
fn sort_by_age_desc_then_username_nulls_last() {
    let session = fixture();
    add_member(&session, None, 100);
    add_member(&session, Some("member5"), 100);
    add_member(&session, Some("member6"), 100);

    let member = QMember::member();
    let result = session
        .query_factory()
        .select_from(&member)
        .where_(member.age.eq(100))
        .order_by((member.age.desc(), member.username.asc().nulls_last()))
        .fetch()
        .unwrap();

    assert_eq!(usernames(&result), vec![Some("member5"), Some("member6"), None]);
}

#[test]
fn paging_by_offset_and_limit() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select_from(&member)
        .order_by(member.age.desc())
        .offset(1)
        .limit(2)
        .fetch()
        .unwrap();
    assert_eq!(usernames(&result), vec![Some("member3"), Some("member2")]);
}

#[test]
fn paging_with_total_count() {
    let session = fixture();
    let member = QMember::member();
    let results = session
        .query_factory()
        .select_from(&member)
        .order_by(member.age.desc())
        .offset(1)
        .limit(2)
        .fetch_results()
        .unwrap();

    assert_eq!(results.total(), 4);
    assert_eq!(results.limit(), Some(2));
    assert_eq!(results.offset(), 1);
    assert_eq!(results.results().len(), 2);
}

#[test_case(10, 0, 4; "offset past nothing")]
#[test_case(2, 3, 1; "partial last page")]
#[test_case(2, 4, 0; "offset at end")]
fn paging_bounds(limit: u64, offset: u64, expected: usize) {
    let session = fixture();
    let member = QMember::member();
    let results = session
        .query_factory()
        .select_from(&member)
        .order_by(member.id.asc())
        .offset(offset)
        .limit(limit)
        .fetch_results()
        .unwrap();
    assert_eq!(results.results().len(), expected);
    assert_eq!(results.total(), 4);
}

#[test]
fn aggregation() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select((
            member.count(),
            member.age.sum(),
            member.age.avg(),
            member.age.max(),
            member.age.min(),
        ))
        .from(&member)
        .fetch()
        .unwrap();

    let tuple = &result[0];
    assert_eq!(tuple.get(&member.count()), Some(4));
    assert_eq!(tuple.get(&member.age.sum()), Some(100));
    assert_eq!(tuple.get(&member.age.avg()), Some(25.0));
    assert_eq!(tuple.get(&member.age.max()), Some(40));
    assert_eq!(tuple.get(&member.age.min()), Some(10));
}

#[test]
fn aggregation_without_rows_yields_one_row() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select((member.count(), member.age.max()))
        .from(&member)
        .where_(member.age.gt(1000))
        .fetch()
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get(&member.count()), Some(0));
    assert_eq!(result[0].get(&member.age.max()), None);
}

#[test]
fn group_by_team_name() {
    let session = fixture();
    let member = QMember::member();
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select((&team.name, member.age.avg()))
        .from(&member)
        .join(&member.team, &team)
        .group_by(&team.name)
        .fetch()
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].get(&team.name).as_deref(), Some("teamA"));
    assert_eq!(result[0].get(&member.age.avg()), Some(15.0));
    assert_eq!(result[1].get(&team.name).as_deref(), Some("teamB"));
    assert_eq!(result[1].get(&member.age.avg()), Some(35.0));
}

#[test]
fn having_filters_groups() {
    let session = fixture();
    let member = QMember::member();
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select(&team.name)
        .from(&member)
        .join(&member.team, &team)
        .group_by(&team.name)
        .having(member.age.avg().gt(20.0))
        .fetch()
        .unwrap();
    assert_eq!(result, vec![Some("teamB".to_string())]);
}

#[test]
fn distinct_keeps_first_occurrence() {
    let session = fixture();
    let member = QMember::member();
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select(&team.name)
        .from(&member)
        .join(&member.team, &team)
        .distinct()
        .fetch()
        .unwrap();
    assert_eq!(result, vec![Some("teamA".to_string()), Some("teamB".to_string())]);
}

#[test]
fn join_members_of_team_a() {
    let session = fixture();
    let member = QMember::member();
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select_from(&member)
        .join(&member.team, &team)
        .where_(team.name.eq("teamA"))
        .fetch()
        .unwrap();
    assert_eq!(usernames(&result), vec![Some("member1"), Some("member2")]);
}

#[test]
fn theta_join() {
    let session = fixture();
    add_member(&session, Some("teamA"), 0);
    add_member(&session, Some("teamB"), 0);
    add_member(&session, Some("teamC"), 0);

    let member = QMember::member();
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select(&member)
        .from(&member)
        .from(&team)
        .where_(member.username.eq(&team.name))
        .fetch()
        .unwrap();
    assert_eq!(usernames(&result), vec![Some("teamA"), Some("teamB")]);
}

#[test]
fn left_join_on_filtering() {
    let session = fixture();
    let member = QMember::member();
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select((&member, &team))
        .from(&member)
        .left_join(&member.team, &team)
        .on(team.name.eq("teamA"))
        .fetch()
        .unwrap();

    assert_eq!(result.len(), 4);
    let teams: Vec<Option<String>> = result
        .iter()
        .map(|tuple| tuple.get_entity(&team).unwrap().and_then(|t| t.name))
        .collect();
    assert_eq!(
        teams,
        vec![Some("teamA".to_string()), Some("teamA".to_string()), None, None]
    );
}

#[test]
fn left_join_without_relation() {
    let session = fixture();
    add_member(&session, Some("teamA"), 0);
    add_member(&session, Some("teamB"), 0);
    add_member(&session, Some("teamC"), 0);

    let member = QMember::member();
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select((&member, &team))
        .from(&member)
        .left_join_entity(&team)
        .on(member.username.eq(&team.name))
        .fetch()
        .unwrap();

    assert_eq!(result.len(), 7);
    let matched: Vec<(Option<String>, Option<String>)> = result
        .iter()
        .map(|tuple| {
            (
                tuple.get_entity(&member).unwrap().and_then(|m| m.username),
                tuple.get_entity(&team).unwrap().and_then(|t| t.name),
            )
        })
        .filter(|(_, team)| team.is_some())
        .collect();
    assert_eq!(
        matched,
        vec![
            (Some("teamA".to_string()), Some("teamA".to_string())),
            (Some("teamB".to_string()), Some("teamB".to_string())),
        ]
    );
}

#[test]
fn join_on_without_join_is_build_error() {
    let session = fixture();
    let member = QMember::member();
    let error = session
        .query_factory()
        .select_from(&member)
        .on(member.age.eq(10))
        .fetch()
        .unwrap_err();
    assert!(error.is_build_error());
    assert!(matches!(error, Error::Build(BuildError::JoinConditionWithoutJoin)));
}

#[test]
fn undeclared_alias_is_build_error() {
    let session = fixture();
    let member = QMember::member();
    let team = QTeam::team();
    let error = session
        .query_factory()
        .select_from(&member)
        .where_(team.name.eq("teamA"))
        .fetch()
        .unwrap_err();
    assert!(matches!(
        error,
        Error::Build(BuildError::UnreachableAlias { ref alias }) if alias == "team"
    ));
}

#[test]
fn without_fetch_join_team_is_not_loaded() {
    let session = fixture();
    session.flush().unwrap();
    session.clear();

    let member = QMember::member();
    let found = session
        .query_factory()
        .select_from(&member)
        .where_(member.username.eq("member1"))
        .fetch_one()
        .unwrap()
        .unwrap();

    let team = found.team.as_ref().unwrap();
    assert!(!session.is_loaded(team));
    assert_eq!(session.load(team).unwrap().name.as_deref(), Some("teamA"));
}

#[test]
fn fetch_join_loads_team() {
    let session = fixture();
    session.flush().unwrap();
    session.clear();

    let member = QMember::member();
    let team = QTeam::team();
    let found = session
        .query_factory()
        .select_from(&member)
        .join(&member.team, &team)
        .fetch_join()
        .where_(member.username.eq("member1"))
        .fetch_one()
        .unwrap()
        .unwrap();

    assert!(session.is_loaded(found.team.as_ref().unwrap()));
    assert_eq!(found.team().and_then(|t| t.name.as_deref()), Some("teamA"));
}

#[test]
fn managed_team_is_loaded_without_fetch_join() {
    let session = fixture();
    let member = QMember::member();
    let found = session
        .query_factory()
        .select_from(&member)
        .where_(member.username.eq("member3"))
        .fetch_one()
        .unwrap()
        .unwrap();
    assert_eq!(found.team().and_then(|t| t.name.as_deref()), Some("teamB"));
}

#[test]
fn subquery_max_age() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let result = session
        .query_factory()
        .select_from(&member)
        .where_(member.age.eq(select(&member_sub.age.max()).from(&member_sub)))
        .fetch()
        .unwrap();
    assert_eq!(result.iter().map(|m| m.age).collect::<Vec<_>>(), vec![40]);
}

#[test]
fn subquery_age_at_least_average() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let result = session
        .query_factory()
        .select_from(&member)
        .where_(member.age.as_f64().goe(select(&member_sub.age.avg()).from(&member_sub)))
        .fetch()
        .unwrap();
    assert_eq!(result.iter().map(|m| m.age).collect::<Vec<_>>(), vec![30, 40]);
}

#[test]
fn subquery_in() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let result = session
        .query_factory()
        .select_from(&member)
        .where_(member.age.is_in_subquery(
            select(&member_sub.age)
                .from(&member_sub)
                .where_(member_sub.age.gt(10)),
        ))
        .fetch()
        .unwrap();
    assert_eq!(result.iter().map(|m| m.age).collect::<Vec<_>>(), vec![20, 30, 40]);
}

#[test]
fn correlated_subquery_counts_teammates() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let team = QTeam::team();
    let result = session
        .query_factory()
        .select_from(&member)
        .join(&member.team, &team)
        .where_(member.age.eq(
            select(&member_sub.age.max())
                .from(&member_sub)
                .where_(Expr::<i64>::column("memberSub", "team_id").eq(&team.id)),
        ))
        .fetch()
        .unwrap();
    assert_eq!(usernames(&result), vec![Some("member2"), Some("member4")]);
}

#[test]
fn scalar_subquery_in_select() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let result = session
        .query_factory()
        .select((&member.username, select(&member_sub.age.avg()).from(&member_sub)))
        .from(&member)
        .fetch()
        .unwrap();

    assert_eq!(result.len(), 4);
    for tuple in &result {
        assert_eq!(tuple.get_at::<f64>(1), Some(25.0));
    }
}

#[test]
fn scalar_subquery_with_many_rows_fails() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let error = session
        .query_factory()
        .select_from(&member)
        .where_(member.age.eq(select(&member_sub.age).from(&member_sub)))
        .fetch()
        .unwrap_err();
    assert!(matches!(
        error,
        Error::Execution(ExecutionError::SubqueryCardinality(4))
    ));
}

#[test]
fn simple_case() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(
            member
                .age
                .when(10)
                .then("ten")
                .when(20)
                .then("twenty")
                .otherwise("other"),
        )
        .from(&member)
        .fetch()
        .unwrap();
    let labels: Vec<_> = result.iter().map(|label| label.as_deref()).collect();
    assert_eq!(labels, vec![Some("ten"), Some("twenty"), Some("other"), Some("other")]);
}

#[test]
fn searched_case() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(
            CaseBuilder::new()
                .when(member.age.between(0, 20))
                .then("0~20")
                .when(member.age.between(21, 30))
                .then("21~30")
                .otherwise("etc"),
        )
        .from(&member)
        .fetch()
        .unwrap();
    let labels: Vec<_> = result.iter().map(|label| label.as_deref()).collect();
    assert_eq!(labels, vec![Some("0~20"), Some("0~20"), Some("21~30"), Some("etc")]);
}

#[test]
fn constant_column() {
    let session = fixture();
    let member = QMember::member();
    let a = constant::<String>("A");
    let result = session
        .query_factory()
        .select((&member.username, &a))
        .from(&member)
        .fetch()
        .unwrap();
    assert!(result.iter().all(|tuple| tuple.get(&a).as_deref() == Some("A")));
}

#[test]
fn concat_username_and_age() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(member.username.concat("_").concat(member.age.string_value()))
        .from(&member)
        .where_(member.username.eq("member1"))
        .fetch()
        .unwrap();
    assert_eq!(result, vec![Some("member1_10".to_string())]);
}

#[test]
fn concat_with_null_is_null() {
    let session = fixture();
    add_member(&session, None, 50);
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(member.username.concat("_"))
        .from(&member)
        .where_(member.age.eq(50))
        .fetch()
        .unwrap();
    assert_eq!(result, vec![None]);
}

#[test]
fn string_predicates() {
    let session = fixture();
    let member = QMember::member();
    let query = session.query_factory();

    let like = query
        .select_from(&member)
        .where_(member.username.like("member_"))
        .fetch_count()
        .unwrap();
    assert_eq!(like, 4);

    let contains = query
        .select_from(&member)
        .where_(member.username.contains("ber3"))
        .fetch()
        .unwrap();
    assert_eq!(usernames(&contains), vec![Some("member3")]);

    let not = query
        .select_from(&member)
        .where_(member.username.starts_with("member").and(member.age.ne(10)).not())
        .fetch()
        .unwrap();
    assert_eq!(usernames(&not), vec![Some("member1")]);
}

#[test]
fn membership_predicates() {
    let session = fixture();
    let member = QMember::member();
    let query = session.query_factory();

    let outside = query
        .select_from(&member)
        .where_(member.age.not_between(15, 35))
        .fetch()
        .unwrap();
    assert_eq!(usernames(&outside), vec![Some("member1"), Some("member4")]);

    let not_in = query
        .select_from(&member)
        .where_((member.age.not_in([10, 20]), member.age.lt(40)))
        .fetch()
        .unwrap();
    assert_eq!(usernames(&not_in), vec![Some("member3")]);

    let at_most = query
        .select_from(&member)
        .where_(member.age.loe(20))
        .fetch_count()
        .unwrap();
    assert_eq!(at_most, 2);
}

#[test]
fn simple_projection() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(&member.username)
        .from(&member)
        .fetch()
        .unwrap();
    assert_eq!(
        result,
        ["member1", "member2", "member3", "member4"]
            .iter()
            .map(|name| Some(name.to_string()))
            .collect::<Vec<_>>()
    );
}

#[test]
fn tuple_projection() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select((&member.username, &member.age))
        .from(&member)
        .fetch()
        .unwrap();
    let pairs: Vec<_> = result
        .iter()
        .map(|tuple| (tuple.get(&member.username), tuple.get(&member.age)))
        .collect();
    assert_eq!(pairs[0], (Some("member1".to_string()), Some(10)));
    assert_eq!(pairs[3], (Some("member4".to_string()), Some(40)));
}

fn expected_member_dtos() -> Vec<MemberDto> {
    vec![
        MemberDto::new(Some("member1".to_string()), 10),
        MemberDto::new(Some("member2".to_string()), 20),
        MemberDto::new(Some("member3".to_string()), 30),
        MemberDto::new(Some("member4".to_string()), 40),
    ]
}

#[test]
fn dto_by_text_query_constructor() {
    let session = fixture();
    let result = session
        .create_query("select new study.querydsl.dto.MemberDto(m.username, m.age) from Member m")
        .unwrap()
        .get_result_list_as::<MemberDto>()
        .unwrap();
    assert_eq!(result, expected_member_dtos());
}

#[test]
fn dto_by_setter() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(Projections::bean::<MemberDto>((&member.username, &member.age)))
        .from(&member)
        .fetch()
        .unwrap();
    assert_eq!(result, expected_member_dtos());
}

#[test]
fn dto_by_fields() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(Projections::fields::<MemberDto>((&member.username, &member.age)))
        .from(&member)
        .fetch()
        .unwrap();
    assert_eq!(result, expected_member_dtos());
}

#[test]
fn dto_by_constructor() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(Projections::constructor::<MemberDto>((&member.username, &member.age)))
        .from(&member)
        .fetch()
        .unwrap();
    assert_eq!(result, expected_member_dtos());
}

#[test]
fn user_dto_by_alias() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(Projections::fields::<UserDto>((member.username.as_("name"), &member.age)))
        .from(&member)
        .fetch()
        .unwrap();
    assert_eq!(result[0], UserDto::new(Some("member1".to_string()), 10));
}

#[test]
fn user_dto_with_subquery_alias() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let result = session
        .query_factory()
        .select(Projections::fields::<UserDto>((
            member.username.as_("name"),
            select(&member_sub.age.max()).from(&member_sub).as_("age"),
        )))
        .from(&member)
        .fetch()
        .unwrap();
    assert_eq!(result.len(), 4);
    assert!(result.iter().all(|dto| dto.age == 40));
    assert_eq!(result[1].name.as_deref(), Some("member2"));
}

#[test]
fn user_dto_by_constructor() {
    let session = fixture();
    let member = QMember::member();
    let result = session
        .query_factory()
        .select(Projections::constructor::<UserDto>((&member.username, &member.age)))
        .from(&member)
        .fetch()
        .unwrap();
    assert_eq!(result[3], UserDto::new(Some("member4".to_string()), 40));
}

#[test]
fn dto_without_alias_is_build_error() {
    let session = fixture();
    let member = QMember::member();
    let member_sub = QMember::new("memberSub");
    let error = session
        .query_factory()
        .select(Projections::fields::<UserDto>((
            member.username.as_("name"),
            select(&member_sub.age.max()).from(&member_sub),
        )))
        .from(&member)
        .fetch()
        .unwrap_err();
    assert!(matches!(
        error,
        Error::Build(BuildError::MissingAlias { position: 2 })
    ));
}

#[test]
fn constructor_arity_mismatch_is_build_error() {
    let session = fixture();
    let member = QMember::member();
    let error = session
        .query_factory()
        .select(Projections::constructor::<MemberDto>(vec![member
            .username
            .expression()
            .clone()]))
        .from(&member)
        .fetch()
        .unwrap_err();
    assert!(matches!(
        error,
        Error::Build(BuildError::ConstructorArity { expected: 2, actual: 1 })
    ));
}

#[test]
fn text_query_join_fetch_and_tuples() {
    let session = fixture();
    session.flush().unwrap();
    session.clear();

    let members = session
        .create_query("select m from Member m join fetch m.team t where t.name = :name order by m.age desc")
        .unwrap()
        .set_parameter("name", "teamB")
        .get_result_list::<Member>()
        .unwrap();
    assert_eq!(usernames(&members), vec![Some("member4"), Some("member3")]);
    assert!(members.iter().all(|m| m.team.as_ref().map_or(false, |t| t.is_loaded())));

    let tuples = session
        .create_query("select t.name, avg(m.age) as ageAvg from Member m join m.team t group by t.name order by ageAvg desc")
        .unwrap()
        .get_tuples()
        .unwrap();
    assert_eq!(tuples.len(), 2);
    assert_eq!(tuples[0].get_at::<String>(0).as_deref(), Some("teamB"));
    assert_eq!(tuples[0].get_at::<f64>(1), Some(35.0));
}

#[test]
fn text_query_left_join_on_and_subquery() {
    let session = fixture();
    let tuples = session
        .create_query("select m, t from Member m left join m.team t on t.name = 'teamA'")
        .unwrap()
        .get_tuples()
        .unwrap();
    let teams: Vec<Option<Team>> = tuples.iter().map(|t| t.entity_at::<Team>(1).unwrap()).collect();
    assert_eq!(teams.iter().filter(|team| team.is_some()).count(), 2);

    let oldest = session
        .create_query("select m from Member m where m.age = (select max(s.age) from Member s)")
        .unwrap()
        .get_single_result::<Member>()
        .unwrap();
    assert_eq!(oldest.map(|m| m.age), Some(40));
}

#[test]
fn text_query_errors() {
    let session = fixture();
    let error = session.create_query("select m from Missing m").map(|_| ()).unwrap_err();
    assert!(error.is_build_error());

    let unbound = session
        .create_query("select m from Member m where m.username = :username")
        .unwrap()
        .get_result_list::<Member>()
        .unwrap_err();
    assert!(matches!(
        unbound,
        Error::Build(BuildError::UnboundParameter(ref name)) if name == "username"
    ));

    let wrong_entity = session
        .create_query("select m from Member m")
        .unwrap()
        .get_result_list::<Team>()
        .unwrap_err();
    assert!(matches!(wrong_entity, Error::Build(BuildError::ProjectionMismatch(_))));

    let wrong_dto = session
        .create_query("select new a.OtherDto(m.username, m.age) from Member m")
        .unwrap()
        .get_result_list_as::<MemberDto>()
        .unwrap_err();
    assert!(matches!(wrong_dto, Error::Build(BuildError::ProjectionMismatch(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // 条件の並びは常にANDで、明示的な and と同じ結果になる
    #[test]
    fn condition_list_is_conjunction(low in 0i32..50, high in 0i32..50) {
        let session = fixture();
        let member = QMember::member();
        let query = session.query_factory();

        let listed = query
            .select(&member.age)
            .from(&member)
            .where_((member.age.goe(low), member.age.loe(high)))
            .fetch()
            .unwrap();
        let chained = query
            .select(&member.age)
            .from(&member)
            .where_(member.age.goe(low).and(member.age.loe(high)))
            .fetch()
            .unwrap();
        let expected: Vec<Option<i32>> = [10, 20, 30, 40]
            .into_iter()
            .filter(|age| *age >= low && *age <= high)
            .map(Some)
            .collect();

        prop_assert_eq!(&listed, &chained);
        prop_assert_eq!(listed, expected);
    }
}
