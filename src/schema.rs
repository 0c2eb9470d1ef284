table! {
    account (id) {
        id -> Int4,
        user_id -> Int4,
        provider -> Text,
        provider_account_id -> Text,
    }
}

table! {
    app_user (id) {
        id -> Int4,
        username -> Text,
        email -> Text,
        password_hash -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    blog (id) {
        id -> Int4,
        title -> Text,
        content -> Text,
        cover_image -> Text,
        tags -> Text,
        author_id -> Int4,
        created_at -> Timestamptz,
    }
}

table! {
    community (id) {
        id -> Int4,
        name -> Text,
        slug -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        creator_id -> Nullable<Int4>,
    }
}

table! {
    post (id) {
        id -> Int4,
        title -> Text,
        content -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        author_id -> Int4,
        community_id -> Int4,
    }
}

table! {
    session (id) {
        id -> Text,
        expires -> Timestamptz,
        user_id -> Int4,
    }
}

table! {
    subscription (user_id, community_id) {
        user_id -> Int4,
        community_id -> Int4,
    }
}

table! {
    use diesel::sql_types::*;
    use crate::models::post::sql_types::VoteType;

    vote (user_id, post_id) {
        user_id -> Int4,
        post_id -> Int4,
        vote_type -> VoteType,
    }
}

joinable!(account -> app_user (user_id));
joinable!(blog -> app_user (author_id));
joinable!(community -> app_user (creator_id));
joinable!(post -> app_user (author_id));
joinable!(post -> community (community_id));
joinable!(session -> app_user (user_id));
joinable!(subscription -> app_user (user_id));
joinable!(subscription -> community (community_id));
joinable!(vote -> app_user (user_id));
joinable!(vote -> post (post_id));

allow_tables_to_appear_in_same_query!(
    account,
    app_user,
    blog,
    community,
    post,
    session,
    subscription,
    vote,
);
