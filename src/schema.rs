table! {
    comments (id) {
        id -> Int4,
        content -> Text,
        post_id -> Int4,
        user_id -> Int4,
        created_at -> Timestamp,
    }
}

table! {
    likes (id) {
        id -> Int4,
        user_id -> Int4,
        post_id -> Nullable<Int4>,
        comment_id -> Nullable<Int4>,
        created_at -> Timestamp,
    }
}

table! {
    post_tags (post_id, tag_id) {
        post_id -> Int4,
        tag_id -> Int4,
    }
}

table! {
    posts (id) {
        id -> Int4,
        title -> Varchar,
        content -> Text,
        published -> Bool,
        published_at -> Nullable<Timestamp>,
        image -> Nullable<Varchar>,
        author_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    tags (id) {
        id -> Int4,
        name -> Varchar,
    }
}

table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        username -> Varchar,
        password -> Varchar,
        is_admin -> Bool,
        created_at -> Timestamp,
    }
}

joinable!(comments -> posts (post_id));
joinable!(comments -> users (user_id));
joinable!(likes -> users (user_id));
joinable!(post_tags -> posts (post_id));
joinable!(post_tags -> tags (tag_id));
joinable!(posts -> users (author_id));

allow_tables_to_appear_in_same_query!(
    comments,
    likes,
    post_tags,
    posts,
    tags,
    users,
);
