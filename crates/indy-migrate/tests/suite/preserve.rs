use indy_migrate::{migrate_compilation_unit, MigrateError};
use indy_syntax::{parse_java, print};
use pretty_assertions::assert_eq;

use super::{layout, migrate};

const NESTED: &str = r#"import io.opentelemetry.javaagent.extension.instrumentation.TypeInstrumentation;
import io.opentelemetry.javaagent.extension.instrumentation.TypeTransformer;
import net.bytebuddy.asm.Advice;
import net.bytebuddy.description.type.TypeDescription;
import net.bytebuddy.matcher.ElementMatcher;

import java.util.function.Supplier;

import static net.bytebuddy.matcher.ElementMatchers.named;

public class NestedClass implements TypeInstrumentation {

    @Override
    public ElementMatcher<TypeDescription> typeMatcher() {
        //Some comment
        return named("foo.bar.Baz");
        //Some unnecessary whitespaces below we still want to preserve

    }

    @Override
    public void transform(TypeTransformer typeTransformer) {

    }

    public static class SimpleWriteReturn {

        @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
        public static void overrideReturn(@Advice.Return(readOnly = false) String instrumentedReturn, @Advice.Thrown Throwable error) {
            //Some nested code whose return values MUST NOT be changed

            Supplier<String> myLambda = () -> {
                return "bar";
            };
            Object myAnonym = new Object() {
                @Override
                public String toString() {
                    return "bar";
                }
            };
            class localClass {
                @Override
                public String toString() {
                    return "bar";
                }
            }
            instrumentedReturn = "foo";
        }

    }


}
"#;

#[test]
fn nested_advice_leaves_closures_and_untouched_members_alone() {
    let migrated = migrate(NESTED);
    assert_eq!(
        migrated.report.migrated_classes,
        vec!["NestedClass.SimpleWriteReturn"]
    );
    assert!(migrated.text.contains(
        "        //Some unnecessary whitespaces below we still want to preserve\n\n    }"
    ));
    assert!(migrated
        .text
        .contains("public void transform(TypeTransformer typeTransformer) {\n\n    }"));

    assert_eq!(
        layout(&migrated.text),
        layout(
            r#"import io.opentelemetry.javaagent.extension.instrumentation.TypeInstrumentation;
import io.opentelemetry.javaagent.extension.instrumentation.TypeTransformer;
import net.bytebuddy.asm.Advice;
import net.bytebuddy.description.type.TypeDescription;
import net.bytebuddy.matcher.ElementMatcher;
import java.util.function.Supplier;
import static net.bytebuddy.matcher.ElementMatchers.named;
import net.bytebuddy.asm.Advice.AssignReturned;

public class NestedClass implements TypeInstrumentation {
    @Override
    public ElementMatcher<TypeDescription> typeMatcher() {
        //Some comment
        return named("foo.bar.Baz");
        //Some unnecessary whitespaces below we still want to preserve
    }

    @Override
    public void transform(TypeTransformer typeTransformer) {
    }

    public static class SimpleWriteReturn {
        @AssignReturned.ToReturned
        @Advice.OnMethodExit(suppress = Throwable.class, onThrowable = Throwable.class)
        public static String overrideReturn(@Advice.Thrown Throwable error) {
            //Some nested code whose return values MUST NOT be changed
            Supplier<String> myLambda = () -> {
                return "bar";
            };
            Object myAnonym = new Object() {
                @Override
                public String toString() {
                    return "bar";
                }
            };
            class localClass {
                @Override
                public String toString() {
                    return "bar";
                }
            }
            return "foo";
        }
    }
}
"#
        )
    );
}

#[test]
fn layout_outside_the_edited_statements_is_kept_byte_for_byte() {
    let src = r#"package demo;

import net.bytebuddy.asm.Advice;

public class FormattedAdvice {
    private static final int   X  =  1;   // aligned


    @Advice.OnMethodExit(suppress = Throwable.class)
    public static void exit(@Advice.Return(readOnly = false) String result) {
        String s = foo(  1,
            2 );
        if (s == null)
        {
            s = "none";
        }

        result = s;
    }

}
"#;
    let migrated = migrate(src);
    assert_eq!(
        migrated.text,
        r#"package demo;

import net.bytebuddy.asm.Advice;
import net.bytebuddy.asm.Advice.AssignReturned;

public class FormattedAdvice {
    private static final int   X  =  1;   // aligned


    @AssignReturned.ToReturned
    @Advice.OnMethodExit(suppress = Throwable.class)
    public static String exit() {
        String s = foo(  1,
            2 );
        if (s == null)
        {
            s = "none";
        }

        return s;
    }

}
"#
    );
}

#[test]
fn sources_without_writes_come_back_unchanged() {
    let src = "import io.opentelemetry.instrumentation.api.util.VirtualField;
import net.bytebuddy.asm.Advice;
import java.util.concurrent.Callable;

public class VirtualFieldsAdvice {

  @Advice.OnMethodEnter()
  public static void onEnter() {
    VirtualField.find(Runnable.class, Integer.class);
    VirtualField.find(Callable.class, Long.class);
  }
  @Advice.OnMethodExit()
  public static void onExit() {
    VirtualField.find(Runnable.class, Integer.class);
  }
}";
    let migrated = migrate(src);
    assert!(!migrated.report.is_changed());
    assert_eq!(migrated.text, src);
}

#[test]
fn byte_order_mark_and_line_endings_survive() {
    let src = "\u{feff}import net.bytebuddy.asm.Advice;\r\n\r\npublic class A {\r\n    @Advice.OnMethodExit\r\n    public static void exit(@Advice.Return(readOnly = false) String value) {\r\n        value = \"x\";\r\n    }\r\n}\r\n";
    let migrated = migrate(src);
    assert!(migrated.report.is_changed());
    assert!(migrated.text.starts_with('\u{feff}'));
    assert!(!migrated.text.replace("\r\n", "").contains('\n'));
    assert!(migrated.text.contains("return \"x\";\r\n"));
}

#[test]
fn failed_units_are_left_as_parsed() {
    let src = r#"import net.bytebuddy.asm.Advice;

public class Good {
    @Advice.OnMethodEnter
    public static void enter(@Advice.Argument(value = 0, readOnly = false) String a) {
        a = "x";
    }
}

class Bad {
    @Advice.OnMethodExit
    public static void exit(@Advice.Return(readOnly = false) String a, @Advice.Return(readOnly = false) String b) {
        a = b;
    }
}
"#;
    let mut unit = parse_java(src).expect("parses");
    let err = migrate_compilation_unit(&mut unit).unwrap_err();
    assert_eq!(
        err,
        MigrateError::MultipleWritableReturns {
            method: "exit".to_string(),
        }
    );
    assert_eq!(print(&unit), src);
}
