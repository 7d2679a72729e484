
use fixtures::{generate_random_whitespace, generate_random_whitespace_at_least_one, get_engine};
use stencil::{
    ArrayLoader, Context, StencilError, StencilInterface, SyntaxErrorKind, Value,
};

#[test]
#[ntest::timeout(100)]
fn test_identity_for_tagless_templates() {
    let engine = get_engine();
    let source = "no tags here.\njust text & <symbols>.\n";

    // Byte-for-byte, whatever the context holds.
    assert_eq!(engine.render(source, None).unwrap(), source);

    let mut context = Context::new();
    context.insert("unused", "value");
    assert_eq!(engine.render(source, Some(&context)).unwrap(), source);
}

#[test]
#[ntest::timeout(100)]
fn test_basic_substitution() {
    let engine = get_engine();
    let mut context = Context::new();
    context.insert("name", "Jessica");

    let rendered = engine.render("Hello, {{ name }}!", Some(&context)).unwrap();
    assert_eq!(
        rendered, "Hello, Jessica!",
        "Rendered string should match the template."
    );
}

#[test]
#[ntest::timeout(100)]
fn test_escaping_on_and_off() {
    let engine = get_engine();
    let mut context = Context::new();
    context.insert("v", r#"<a href="x">&'y'</a>"#);

    assert_eq!(
        engine.render("{{v}}", Some(&context)).unwrap(),
        "&lt;a href=&quot;x&quot;&gt;&amp;&#39;y&#39;&lt;/a&gt;"
    );
    assert_eq!(
        engine.render("{{{v}}}", Some(&context)).unwrap(),
        r#"<a href="x">&'y'</a>"#
    );
    assert_eq!(
        engine.render("{{&v}}", Some(&context)).unwrap(),
        r#"<a href="x">&'y'</a>"#
    );
}

#[test]
#[ntest::timeout(100)]
fn test_recompilation_counted_once() {
    let engine = get_engine();
    let source = "Hello, {{name}}!";

    assert_eq!(engine.template_id(source), engine.template_id(source));

    engine.render(source, None).unwrap();
    assert_eq!(engine.cache().compile_count(), 1);

    // Second render of the same source is a cache hit.
    engine.render(source, None).unwrap();
    assert_eq!(engine.cache().compile_count(), 1);

    engine.render("different {{x}}", None).unwrap();
    assert_eq!(engine.cache().compile_count(), 2);
}

#[test]
#[ntest::timeout(100)]
fn test_unmatched_close_is_an_error() {
    let engine = get_engine();
    let err = engine.render("{{/a}}", None).unwrap_err();
    let StencilError::Syntax(syntax) = err else {
        panic!("expected a syntax error, got {:?}", err);
    };
    assert_eq!(syntax.line, 1);
    assert!(matches!(
        syntax.kind,
        SyntaxErrorKind::UnexpectedSectionClose { ref name } if name == "a"
    ));
}

#[test]
#[ntest::timeout(100)]
fn test_unclosed_section_is_an_error() {
    let engine = get_engine();
    let err = engine.render("{{#a}}body", None).unwrap_err();
    let StencilError::Syntax(syntax) = err else {
        panic!("expected a syntax error, got {:?}", err);
    };
    assert!(
        matches!(syntax.kind, SyntaxErrorKind::UnclosedSection { ref name } if name == "a")
    );
}

#[test]
#[ntest::timeout(100)]
fn test_inverted_section_follows_truthiness() {
    let engine = get_engine();
    let template = "{{^value}}empty{{/value}}";

    let mut context = Context::new();
    context.insert("value", Value::List(vec![]));
    assert_eq!(engine.render(template, Some(&context)).unwrap(), "empty");

    let mut context = Context::new();
    context.insert("value", vec![1]);
    assert_eq!(engine.render(template, Some(&context)).unwrap(), "");

    // Absent resolves falsy too.
    assert_eq!(engine.render(template, None).unwrap(), "empty");
}

#[test]
#[ntest::timeout(100)]
fn test_sequence_section_iterates_in_order() {
    let engine = get_engine();
    let mut context = Context::new();
    context.insert("items", vec!["a", "b"]);
    assert_eq!(
        engine
            .render("{{#items}}{{.}},{{/items}}", Some(&context))
            .unwrap(),
        "a,b,"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_scope_shadowing_with_fallback() {
    let engine = get_engine();
    let mut context = Context::new();
    let mut user = Context::new();
    user.insert("name", "x");
    context.insert("user", user);
    context.insert("name", "outer");

    let rendered = engine
        .render("{{#user}}{{name}}{{/user}} and {{name}}", Some(&context))
        .unwrap();
    assert_eq!(rendered, "x and outer");

    // A name only present in the outer scope is still reachable from
    // inside the section.
    context.insert("title", "dr");
    let rendered = engine
        .render("{{#user}}{{name}}/{{title}}{{/user}}", Some(&context))
        .unwrap();
    assert_eq!(rendered, "x/dr");
}

#[test]
#[ntest::timeout(100)]
fn test_dotted_paths() {
    let engine = get_engine();
    let mut address = Context::new();
    address.insert("city", "Reykjavik");
    let mut user = Context::new();
    user.insert("address", address);
    let mut context = Context::new();
    context.insert("user", user);

    assert_eq!(
        engine.render("{{user.address.city}}", Some(&context)).unwrap(),
        "Reykjavik"
    );
    assert_eq!(
        engine.render("[{{user.address.zip}}]", Some(&context)).unwrap(),
        "[]"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_partial_inherits_caller_context() {
    let mut engine = get_engine();
    engine.set_partials([("badge", "{{name}} <{{email}}>")]).unwrap();

    let mut context = Context::new();
    context.insert("name", "ada");
    context.insert("email", "ada@example.com");
    assert_eq!(
        engine.render("To: {{>badge}}", Some(&context)).unwrap(),
        "To: ada <ada@example.com>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_partial_indentation_applied_per_line() {
    let mut engine = get_engine();
    engine.set_partials([("child", "line1\nline2\n")]).unwrap();

    let rendered = engine.render("  {{>child}}\n", None).unwrap();
    assert_eq!(rendered, "  line1\n  line2\n");
}

#[test]
#[ntest::timeout(100)]
fn test_standalone_section_lines_leave_no_blank_lines() {
    let engine = get_engine();
    let mut context = Context::new();
    context.insert("show", true);

    let template = "Header\n{{#show}}\nBody\n{{/show}}\nFooter\n";
    assert_eq!(
        engine.render(template, Some(&context)).unwrap(),
        "Header\nBody\nFooter\n"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_delimiter_change_applies_immediately() {
    let engine = get_engine();
    let mut context = Context::new();
    context.insert("name", "ada");

    assert_eq!(
        engine
            .render("{{=<% %>=}}<%name%> {{name}}", Some(&context))
            .unwrap(),
        "ada {{name}}"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_malformed_delimiter_change_is_an_error() {
    let engine = get_engine();
    let err = engine.render("{{=onlyone=}}", None).unwrap_err();
    let StencilError::Syntax(syntax) = err else {
        panic!("expected a syntax error, got {:?}", err);
    };
    assert!(matches!(syntax.kind, SyntaxErrorKind::InvalidDelimiters { .. }));
}

#[test]
#[ntest::timeout(100)]
fn test_lambda_section_expands_and_reparses() {
    let engine = get_engine();
    let mut context = Context::new();
    context.insert("bold", Value::lambda(|raw| format!("<b>{}</b>", raw)));
    context.insert("name", "ada");

    assert_eq!(
        engine
            .render("{{#bold}}hi {{name}}{{/bold}}", Some(&context))
            .unwrap(),
        "<b>hi ada</b>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_zero_is_truthy_in_sections() {
    let engine = get_engine();
    let mut context = Context::new();
    context.insert("count", 0);

    assert_eq!(
        engine
            .render("{{#count}}have {{count}}{{/count}}", Some(&context))
            .unwrap(),
        "have 0"
    );
    assert_eq!(
        engine.render("{{^count}}none{{/count}}", Some(&context)).unwrap(),
        ""
    );
}

#[test]
#[ntest::timeout(1000)]
fn test_partial_recursion_fails_without_overflow() {
    let mut engine = get_engine();
    engine.set_partials([("loop", "again {{>loop}}")]).unwrap();

    let err = engine.render("{{>loop}}", None).unwrap_err();
    assert!(matches!(err, StencilError::Render { .. }), "got {:?}", err);

    // The failure is per render call; the engine stays usable.
    assert_eq!(engine.render("still {{fine}}", None).unwrap(), "still ");
}

#[test]
#[ntest::timeout(100)]
fn test_missing_named_template() {
    let mut engine = get_engine();
    engine.set_loader(ArrayLoader::new());
    let err = engine.render("ghost", None).unwrap_err();
    assert!(
        matches!(err, StencilError::MissingTemplate { ref template_name } if template_name == "ghost")
    );
}

#[test]
#[ntest::timeout(100)]
fn test_whitespace_inside_tags_is_insignificant() {
    let engine = get_engine();
    let template = format!(
        "{{{{#cats{}}}}}Greetings {{{{{}name{}}}}}\n{{{{/cats{}}}}}",
        generate_random_whitespace(),
        generate_random_whitespace_at_least_one(),
        generate_random_whitespace(),
        generate_random_whitespace(),
    );

    let mut fluffy = Context::new();
    fluffy.insert("name", "Fluffy");
    let mut whiskers = Context::new();
    whiskers.insert("name", "Whiskers");
    let mut context = Context::new();
    context.insert(
        "cats",
        Value::List(vec![fluffy.into(), whiskers.into()]),
    );

    let rendered = engine.render(template.as_str(), Some(&context)).unwrap();
    assert_eq!(rendered, "Greetings Fluffy\nGreetings Whiskers\n");
}
